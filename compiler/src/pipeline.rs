//! Single stage compilation: dialect source -> target source
//!
//! 1. Preprocess defines and conditional blocks
//! 2. Lex the stage prelude and the user source into one token stream
//! 3. Rewrite frag-data writes, infer types, build structs, classify declarations
//! 4. Apply the backend's token rewrites, then discover function ranges
//! 5. Generate the target source and, where the target needs it, reflection
//!
//! Every token-stream rewrite happens before function discovery except Metal
//! argument threading, which edits through `insert_tokens`.

use log::{debug, error, trace, warn};

use diagnostics::shader::ShaderDiagnostics;
use diagnostics::{DiagnosticResult, Diagnostics, ShaderStage};
use parser::{finish, preprocess, Lexer, PreprocessorConfig, SymbolTables};

use crate::analyzer::{self, functions, ShaderUnit, FRAG_DATA_PREFIX};
use crate::codegen;
use crate::context::CompileContext;
use crate::error::CompileError;
use crate::reflection::{reflect, wants_reflection, Reflection};

/// Number of `_Frag_DataN` outputs a fragment stage may write
pub const MAX_FRAG_DATA: u32 = 8;

/// One translated stage
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub stage: ShaderStage,
    pub source: String,
    pub entry_point: String,
    /// Version or profile string of the target, if it has one
    pub version: Option<String>,
    pub reflection: Option<Reflection>,
    /// Warnings and notes of a successful compile
    pub diagnostics: Diagnostics,
}

/// Declarations every stage of `stage` implicitly sees
fn prelude(stage: ShaderStage) -> String {
    match stage {
        ShaderStage::Vertex => "out vec4 gl_Position;\n".to_string(),
        ShaderStage::Fragment => (0..MAX_FRAG_DATA)
            .map(|n| format!("out vec4 {}{};\n", FRAG_DATA_PREFIX, n))
            .collect(),
        _ => String::new(),
    }
}

fn failed(mut diagnostics: Diagnostics, stage: ShaderStage) -> Diagnostics {
    diagnostics.set_stage(stage);
    diagnostics
}

/// Run the pipeline up to function discovery
pub fn build_unit(source: &str, ctx: &CompileContext) -> DiagnosticResult<ShaderUnit> {
    let config = PreprocessorConfig {
        defines: ctx.defines.clone(),
    };
    let preprocessed = preprocess(source, &config);

    let mut tables = SymbolTables::new();
    let mut lexer = Lexer::new(ctx.file_id);
    let mut tokens = lexer.scan(&prelude(ctx.stage), &mut tables);
    // prelude tokens carry no user position
    for token in &mut tokens {
        token.line = 0;
        token.column = 0;
    }
    let prelude_len = tokens.len();
    tokens.extend(lexer.scan(&preprocessed.text, &mut tables));
    if lexer.failed() {
        error!("{} stage failed to tokenize", ctx.stage);
        return Err(failed(lexer.into_diagnostics(), ctx.stage));
    }
    finish(&mut tokens, &mut tables);
    trace!(
        "lexed {} token(s) after a {} token prelude",
        tokens.len() - prelude_len,
        prelude_len
    );

    let force_highp = ctx.force_highp || preprocessed.force_highp;
    let mut unit = ShaderUnit::new(ctx.stage, ctx.file_id, tokens, tables, force_highp);
    unit.diagnostics.extend(lexer.into_diagnostics());

    analyzer::analyze(&mut unit);
    codegen::rewrite(&mut unit, ctx);
    functions::discover(&mut unit);
    if unit.entry_point.is_none() && !unit.diagnostics.has_errors() {
        unit.diagnostics
            .push(ShaderDiagnostics::missing_entry_point(ctx.stage));
    }
    debug!(
        "{} stage: {} function(s), {} uniform(s), {} sampler(s), {} buffer(s)",
        ctx.stage,
        unit.functions.len(),
        unit.uniforms.len(),
        unit.samplers.len(),
        unit.buffers.len()
    );

    if unit.diagnostics.has_errors() {
        return Err(failed(unit.diagnostics, ctx.stage));
    }
    Ok(unit)
}

/// Translate one stage for the context's target
#[tracing::instrument(skip_all, fields(stage = %ctx.stage, target = ?ctx.target))]
pub fn compile_stage(source: &str, ctx: &CompileContext) -> DiagnosticResult<StageOutput> {
    let stage = ctx.stage;
    if !ctx.target.supports_stage(stage) {
        let error = CompileError::UnsupportedStage {
            stage,
            backend: ctx.family().name(),
        };
        return Err(failed(error.into_diagnostics(), stage));
    }

    let mut unit = build_unit(source, ctx)?;
    let generated = codegen::generate(&mut unit, ctx).map_err(|e| failed(e.into_diagnostics(), stage))?;
    let reflection = if wants_reflection(ctx.target, stage) {
        Some(reflect(&unit, ctx.target).map_err(|e| failed(e.into_diagnostics(), stage))?)
    } else {
        None
    };

    let mut diagnostics = std::mem::take(&mut unit.diagnostics);
    if ctx.treat_warnings_as_errors && diagnostics.has_warnings() {
        let promoted = diagnostics.promote_warnings();
        warn!("{} warning(s) promoted to errors in the {} stage", promoted, stage);
        diagnostics.extend(CompileError::WarningsAsErrors(promoted).into_diagnostics());
        return Err(failed(diagnostics, stage));
    }

    Ok(StageOutput {
        stage,
        source: generated,
        entry_point: ctx.target.entry_point(stage).to_string(),
        version: ctx.target.version(stage).map(str::to_string),
        reflection,
        diagnostics: failed(diagnostics, stage),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Target, WorkgroupSize};

    fn compile(target: Target, stage: ShaderStage, source: &str) -> DiagnosticResult<StageOutput> {
        let size = (stage == ShaderStage::Compute).then(|| WorkgroupSize::new(8, 8, 1));
        let ctx = CompileContext::new(target, stage, size).unwrap();
        compile_stage(source, &ctx)
    }

    #[test]
    fn test_frag_data_liveness() {
        let out = compile(
            Target::OpenGl,
            ShaderStage::Fragment,
            "void main() { gl_FragData[2] = vec4(1.0); }\n",
        )
        .unwrap();
        assert!(out.source.contains("layout (location = 2) out vec4 _Frag_Data2;"));
        assert_eq!(out.source.matches("_Frag_Data").count(), 2, "{}", out.source);
        assert!(!out.source.contains("_Frag_Data0"));
    }

    #[test]
    fn test_hlsl_vertex_output() {
        let out = compile(
            Target::Direct3D11,
            ShaderStage::Vertex,
            "uniform mat4 mvp;\nin vec4 position;\nvoid main() { gl_Position = mvp * position; }\n",
        )
        .unwrap();
        let expected = "cbuffer cb0 : register(b0)\n{\n\tfloat4x4 mvp;\n};\n\n\
                        struct Input\n{\n\tfloat4 position:position;\n};\n\n\
                        struct Output\n{\n\tfloat4 gl_Position:SV_POSITION;\n};\n\n\
                        Output vertex_main( Input input, uint gl_VertexID : SV_VertexID)\n{\n\
                        \tOutput output = (Output)0;\n\
                        \toutput.gl_Position = mul ( mvp , input.position ) ;\n\
                        \treturn output;\n}\n\n";
        assert_eq!(out.source, expected);
        assert_eq!(out.entry_point, "vertex_main");
        assert_eq!(out.version.as_deref(), Some("vs_5_0"));
        assert!(out.reflection.is_some());
    }

    #[test]
    fn test_lex_failure_reports_stage() {
        let diagnostics = compile(Target::Vulkan, ShaderStage::Fragment, "void main() { @ }\n").unwrap_err();
        let first = diagnostics.iter().next().unwrap();
        assert_eq!(first.code.as_deref(), Some("E0001"));
        assert_eq!(first.stage, Some(ShaderStage::Fragment));
    }

    #[test]
    fn test_unterminated_entry_point_fails() {
        let diagnostics = compile(
            Target::OpenGl,
            ShaderStage::Vertex,
            "uniform float x;\nvoid main() { gl_Position = vec4(x);\n",
        )
        .unwrap_err();
        let error = diagnostics.errors().next().unwrap();
        assert_eq!(error.code.as_deref(), Some("E0009"));
        assert_eq!(error.stage, Some(ShaderStage::Vertex));
    }

    #[test]
    fn test_missing_entry_point_fails() {
        for target in [Target::OpenGl, Target::Direct3D11, Target::MetalIos] {
            let diagnostics = compile(target, ShaderStage::Fragment, "void mian() { }\n").unwrap_err();
            assert!(
                diagnostics.iter().any(|d| d.code.as_deref() == Some("E0010")),
                "{}",
                diagnostics
            );
        }
        // `main` must return void
        let diagnostics = compile(Target::Vulkan, ShaderStage::Vertex, "float main() { return 1.0; }\n").unwrap_err();
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_unsupported_stage() {
        let diagnostics = compile(Target::MetalMacos, ShaderStage::Geometry, "void main() { }\n").unwrap_err();
        assert!(diagnostics.has_errors());
        assert!(diagnostics.iter().any(|d| d.code.as_deref() == Some("E0007")));
    }

    #[test]
    fn test_warnings_as_errors() {
        let source = "int big = 3000000000;\nvoid main() { }\n";
        let ctx = CompileContext::new(Target::OpenGl, ShaderStage::Vertex, None)
            .unwrap()
            .with_warnings_as_errors(true);
        let diagnostics = compile_stage(source, &ctx).unwrap_err();
        assert!(diagnostics.iter().any(|d| d.code.as_deref() == Some("E0008")));
        assert!(!diagnostics.has_warnings());

        let relaxed = compile(Target::OpenGl, ShaderStage::Vertex, source).unwrap();
        assert!(relaxed.diagnostics.has_warnings());
    }

    #[test]
    fn test_compute_on_every_target() {
        let source = "buffer float data[];\nvoid main() { data[gl_GlobalInvocationID.x] = 1.0; }\n";
        for target in Target::ALL {
            let out = compile(target, ShaderStage::Compute, source).unwrap();
            assert_eq!(out.entry_point, target.entry_point(ShaderStage::Compute));
            assert!(!out.source.is_empty());
        }
    }

    #[test]
    fn test_command_line_defines() {
        let ctx = CompileContext::new(Target::OpenGl, ShaderStage::Vertex, None)
            .unwrap()
            .with_define("SIZE", "4");
        let out = compile_stage("uniform float weights[SIZE];\nvoid main() { }\n", &ctx).unwrap();
        assert!(out.source.contains("uniform float weights[4];"), "{}", out.source);
    }
}
