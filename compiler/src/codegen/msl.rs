//! Metal Shading Language
//!
//! Metal has no global resources. Everything the entry point binds arrives as
//! a parameter, and helper functions receive the buffers, threadgroup memory
//! and globals they touch as extra reference or pointer parameters:
//!
//! ```metal
//! void accumulate ( device float * data , uint i ) {
//!     data [ i ] += 1.0 ;
//!     }
//! ```

use std::collections::BTreeSet;

use smallvec::SmallVec;

use diagnostics::ShaderStage;
use parser::{BaseType, Builtin, IdentId, Keyword, Precision, Symbol, Token, TokenKind, TypeId};

use super::{
    array_suffix, declared, emit_functions, emit_macros, emit_structs, output_slots,
    print_entry_body, remove_after, sampler_name, split_sampler_calls, storage, TokenStyle,
    POSITION,
};
use crate::analyzer::functions::{insert_tokens, matching_close_paren};
use crate::analyzer::{ShaderUnit, StorageQualifier};
use crate::context::{BackendFamily, CompileContext};
use crate::error::CompileError;

/// Compute built-ins and the attribute each one is bound with
const COMPUTE_BUILTINS: &[(&str, &str, &str)] = &[
    ("gl_WorkGroupID", "uint3", "threadgroup_position_in_grid"),
    ("gl_LocalInvocationID", "uint3", "thread_position_in_threadgroup"),
    ("gl_GlobalInvocationID", "uint3", "thread_position_in_grid"),
    ("gl_LocalInvocationIndex", "uint", "thread_index_in_threadgroup"),
    ("gl_NumWorkGroups", "uint3", "threadgroups_per_grid"),
    ("gl_WorkGroupSize", "uint3", "threads_per_threadgroup"),
];

pub(crate) struct MslStyle {
    compute: bool,
}

pub(crate) fn type_name(base: BaseType, precision: Option<Precision>) -> Option<String> {
    use BaseType::*;
    let float = match precision {
        Some(Precision::Medium) | Some(Precision::Low) => "half",
        _ => "float",
    };
    let fixed = match base {
        Float => return Some(float.to_string()),
        Vec2 => return Some(format!("{}2", float)),
        Vec3 => return Some(format!("{}3", float)),
        Vec4 => return Some(format!("{}4", float)),
        Mat2 => return Some(format!("{}2x2", float)),
        Mat3 => return Some(format!("{}3x3", float)),
        Mat4 => return Some(format!("{}4x4", float)),
        Void => "void",
        Int => "int",
        Int2 => "int2",
        Int3 => "int3",
        Int4 => "int4",
        Uint => "uint",
        Uint2 => "uint2",
        Uint3 => "uint3",
        Uint4 => "uint4",
        Bool => "bool",
        Bool2 => "bool2",
        Bool3 => "bool3",
        Bool4 => "bool4",
        Sampler2D | SubpassInput => "texture2d<float>",
        Sampler2DArray => "texture2d_array<float>",
        SamplerCube => "texturecube<float>",
        SamplerCubeArray => "texturecube_array<float>",
        Sampler2DShadow => "depth2d<float>",
        Sampler2DArrayShadow => "depth2d_array<float>",
        SamplerCubeShadow => "depthcube<float>",
        Image2D => "texture2d<float, access::write>",
        Array | Struct(_) => return None,
    };
    Some(fixed.to_string())
}

impl TokenStyle for MslStyle {
    fn family(&self) -> BackendFamily {
        BackendFamily::Msl
    }

    fn type_name(&self, unit: &ShaderUnit, ty: TypeId, precision: Option<Precision>) -> String {
        type_name(unit.tables.ty(ty).base(), precision).unwrap_or_else(|| unit.type_name(ty).to_string())
    }

    fn builtin_name(&self, builtin: Builtin) -> &'static str {
        match builtin {
            Builtin::Barrier => "threadgroup_barrier( mem_flags::mem_none )",
            Builtin::MemoryBarrierShared => "threadgroup_barrier( mem_flags::mem_threadgroup )",
            Builtin::MemoryBarrier => "threadgroup_barrier( mem_flags::mem_device_and_threadgroup )",
            Builtin::Sample | Builtin::SampleLevel => "sample",
            other => other.as_str(),
        }
    }

    fn identifier(&self, unit: &ShaderUnit, id: IdentId, in_entry: bool) -> String {
        let name = unit.name(id);
        if !in_entry {
            return name.to_string();
        }
        match storage(unit, id) {
            StorageQualifier::Uniform => format!("uniforms.{}", name),
            StorageQualifier::In => format!("input.{}", name),
            StorageQualifier::Out => format!("output.{}", name),
            _ => name.to_string(),
        }
    }

    fn keyword(&self, _unit: &ShaderUnit, keyword: Keyword, in_entry: bool) -> Option<String> {
        if keyword.is_precision() {
            return None;
        }
        if keyword == Keyword::Return && in_entry && !self.compute {
            return Some("return output".to_string());
        }
        Some(keyword.as_str().to_string())
    }

    fn sampler_parameter(&self, unit: &ShaderUnit, id: IdentId) -> Option<String> {
        Some(format!(", sampler {} ", sampler_name(unit.name(id))))
    }

    fn sampler_argument(&self, unit: &ShaderUnit, id: IdentId) -> Option<String> {
        Some(format!(", {} ", sampler_name(unit.name(id))))
    }
}

/// Token rewrites: barriers, `discard` and texture sampling
pub fn rewrite(unit: &mut ShaderUnit) {
    let call = [Symbol::LeftParen, Symbol::RightParen];
    for barrier in [Builtin::Barrier, Builtin::MemoryBarrierShared, Builtin::MemoryBarrier] {
        remove_after(unit, barrier, &call, false);
    }

    let mut i = 0;
    while i < unit.tokens.len() {
        let token = unit.tokens[i];
        if token.builtin() == Some(Builtin::Discard) {
            unit.tokens[i].kind = TokenKind::Builtin(Builtin::DiscardFragment);
            let at = |kind| Token::new(kind, token.line, token.column);
            let parens = [at(TokenKind::Symbol(Symbol::LeftParen)), at(TokenKind::Symbol(Symbol::RightParen))];
            unit.tokens.splice(i + 1..i + 1, parens);
            i += parens.len();
        }
        i += 1;
    }

    let calls = split_sampler_calls(unit, |builtin| match builtin {
        Builtin::Texture | Builtin::TextureLod => Some(Builtin::Sample),
        _ => None,
    });
    for (open, original) in calls.into_iter().rev() {
        if original == Builtin::TextureLod {
            wrap_level_argument(unit, open);
        }
    }
}

/// `sample ( s , uv , lod )` -> `sample ( s , uv , level ( lod ) )`
fn wrap_level_argument(unit: &mut ShaderUnit, open: usize) {
    let Some(close) = matching_close_paren(&unit.tokens, open) else {
        return;
    };
    let mut depth = 0i32;
    let mut last_comma = None;
    for k in open + 1..close {
        match unit.tokens[k].kind {
            TokenKind::Symbol(Symbol::LeftParen | Symbol::LeftBracket) => depth += 1,
            TokenKind::Symbol(Symbol::RightParen | Symbol::RightBracket) => depth -= 1,
            TokenKind::Symbol(Symbol::Comma) if depth == 0 => last_comma = Some(k),
            _ => {}
        }
    }
    let Some(comma) = last_comma else {
        return;
    };
    let origin = unit.tokens[open];
    let at = |kind| Token::new(kind, origin.line, origin.column);
    unit.tokens.insert(close, at(TokenKind::Symbol(Symbol::RightParen)));
    unit.tokens.splice(
        comma + 1..comma + 1,
        [at(TokenKind::Reserved(Keyword::Level)), at(TokenKind::Symbol(Symbol::LeftParen))],
    );
}

fn address_space(unit: &ShaderUnit, id: IdentId) -> Keyword {
    let variable = unit.variable(id);
    match variable.storage {
        StorageQualifier::Global => Keyword::Thread,
        StorageQualifier::Shared => Keyword::Threadgroup,
        _ if variable.array_size == 0 && unit.stage == ShaderStage::Fragment => Keyword::Constant,
        _ => Keyword::Device,
    }
}

/// Tokens spliced in at one position
type TokenRun = SmallVec<[Token; 8]>;

/// `device T * name ,` style parameter tokens
fn parameter_tokens(unit: &ShaderUnit, ids: &[IdentId], trailing_comma: bool) -> TokenRun {
    let mut tokens = TokenRun::new();
    for (n, id) in ids.iter().enumerate() {
        let variable = unit.variable(*id);
        let Some(ty) = variable.ty else {
            continue;
        };
        tokens.push(Token::synthetic(TokenKind::Reserved(address_space(unit, *id))));
        match variable.precision {
            Precision::Medium => tokens.push(Token::synthetic(TokenKind::Reserved(Keyword::Mediump))),
            Precision::Low => tokens.push(Token::synthetic(TokenKind::Reserved(Keyword::Lowp))),
            _ => {}
        }
        tokens.push(Token::synthetic(TokenKind::Type(ty)));
        let pointer = if variable.array_size == 0 { Symbol::Amp } else { Symbol::Star };
        tokens.push(Token::synthetic(TokenKind::Symbol(pointer)));
        tokens.push(Token::synthetic(TokenKind::Identifier(*id)));
        if trailing_comma || n + 1 < ids.len() {
            tokens.push(Token::synthetic(TokenKind::Symbol(Symbol::Comma)));
        }
    }
    tokens
}

fn argument_tokens(ids: &[IdentId], trailing_comma: bool) -> TokenRun {
    let mut tokens = TokenRun::new();
    for (n, id) in ids.iter().enumerate() {
        tokens.push(Token::synthetic(TokenKind::Identifier(*id)));
        if trailing_comma || n + 1 < ids.len() {
            tokens.push(Token::synthetic(TokenKind::Symbol(Symbol::Comma)));
        }
    }
    tokens
}

/// Pass buffers, threadgroup memory and globals down every call chain
///
/// A helper's required set is what it references directly plus, to a fixed
/// point, what the helpers it calls require. Variables already threaded are
/// remembered per function, so running this again changes nothing.
pub fn thread_buffers(unit: &mut ShaderUnit) {
    let has_resources = !(unit.buffers.is_empty() && unit.shared.is_empty() && unit.globals.is_empty());
    if unit.functions.len() < 2 || !has_resources {
        return;
    }

    let tokens = &unit.tokens;
    let names: Vec<IdentId> = unit.functions.iter().map(|f| f.name).collect();
    let helper_index = |id: IdentId| {
        names
            .iter()
            .position(|name| *name == id)
            .filter(|&g| !unit.functions[g].is_entry)
    };
    let calls_in = |range: std::ops::Range<usize>| -> Vec<(usize, usize)> {
        range
            .filter(|&k| tokens.get(k + 1).is_some_and(|t| t.is_symbol(Symbol::LeftParen)))
            .filter_map(|k| tokens[k].identifier().and_then(&helper_index).map(|g| (k, g)))
            .collect()
    };

    let mut used: Vec<BTreeSet<IdentId>> = unit
        .functions
        .iter()
        .map(|f| {
            f.args()
                .chain(f.body())
                .filter_map(|k| tokens[k].identifier())
                .filter(|id| storage(unit, *id).is_threaded())
                .collect()
        })
        .collect();
    let calls: Vec<Vec<(usize, usize)>> = unit.functions.iter().map(|f| calls_in(f.body())).collect();

    loop {
        let mut changed = false;
        for f in 0..used.len() {
            for &(_, g) in &calls[f] {
                if g == f {
                    continue;
                }
                let inherited: Vec<IdentId> = used[g].difference(&used[f]).copied().collect();
                changed |= !inherited.is_empty();
                used[f].extend(inherited);
            }
        }
        if !changed {
            break;
        }
    }

    let additions: Vec<Vec<IdentId>> = unit
        .functions
        .iter()
        .zip(&used)
        .map(|(f, required)| {
            if f.is_entry {
                Vec::new()
            } else {
                required.difference(&f.threaded).copied().collect()
            }
        })
        .collect();
    if additions.iter().all(Vec::is_empty) {
        return;
    }

    let mut edits: Vec<(usize, TokenRun)> = Vec::new();
    for (f, function) in unit.functions.iter().enumerate() {
        if !additions[f].is_empty() {
            let trailing_comma = function.arg_count > 0;
            edits.push((function.open_paren() + 1, parameter_tokens(unit, &additions[f], trailing_comma)));
        }
        for &(k, g) in &calls[f] {
            if additions[g].is_empty() {
                continue;
            }
            let empty_call = tokens.get(k + 2).is_some_and(|t| t.is_symbol(Symbol::RightParen));
            edits.push((k + 2, argument_tokens(&additions[g], !empty_call)));
        }
    }
    edits.sort_by(|a, b| b.0.cmp(&a.0));

    log::trace!("threading {} insertion(s) through Metal helpers", edits.len());
    for (pos, new_tokens) in edits {
        insert_tokens(unit, pos, &new_tokens);
    }
    for (function, added) in unit.functions.iter_mut().zip(additions) {
        function.threaded.extend(added);
    }
}

pub fn emit(unit: &ShaderUnit, ctx: &CompileContext) -> Result<String, CompileError> {
    let stage = unit.stage;
    if !matches!(stage, ShaderStage::Vertex | ShaderStage::Fragment | ShaderStage::Compute) {
        return Err(CompileError::UnsupportedStage { stage, backend: "Metal" });
    }
    let compute = ctx.is_compute();
    let style = MslStyle { compute };
    let mut out = String::from("#include <metal_stdlib>\nusing namespace metal;\n\n");

    emit_macros(&mut out, unit, BackendFamily::Msl);
    emit_structs(&mut out, unit, &style);

    if !unit.uniforms.is_empty() {
        out.push_str("struct Uniforms\n{\n");
        for id in &unit.uniforms {
            let (ty, name) = declared(&style, unit, *id);
            let suffix = array_suffix(unit.variable(*id).array_size);
            out.push_str(&format!("\t{} {}{};\n", ty, name, suffix));
        }
        out.push_str("};\n\n");
    }

    if !compute {
        emit_io_structs(&mut out, unit, &style);
    }

    emit_functions(&mut out, unit, &style, |out, entry| {
        out.push_str(match stage {
            ShaderStage::Vertex => "vertex Output vertex_main(",
            ShaderStage::Fragment => "fragment Output fragment_main(",
            _ => "kernel void compute_main(",
        });
        let parameters = entry_parameters(unit, &style);
        if !parameters.is_empty() {
            out.push_str("\n\t");
            out.push_str(&parameters.join(",\n\t"));
        }
        out.push_str(")\n{\n");

        for id in &unit.globals {
            let (ty, name) = declared(&style, unit, *id);
            out.push_str(&format!("\t{} {}{};\n", ty, name, array_suffix(unit.variable(*id).array_size)));
        }
        for id in &unit.shared {
            let (ty, name) = declared(&style, unit, *id);
            out.push_str(&format!(
                "\tthreadgroup {} {}{};\n",
                ty,
                name,
                array_suffix(unit.variable(*id).array_size)
            ));
        }
        if !compute {
            out.push_str("\tOutput output;\n");
        }
        out.push('\t');
        print_entry_body(out, unit, &style, entry);
        if !compute {
            out.push_str("return output;\n");
        }
        out.push_str("}\n\n");
    });

    Ok(out)
}

fn entry_parameters(unit: &ShaderUnit, style: &MslStyle) -> Vec<String> {
    let mut parameters = Vec::new();
    if !style.compute && !unit.inputs.is_empty() {
        parameters.push("Input input [[stage_in]]".to_string());
    }
    if !unit.uniforms.is_empty() {
        parameters.push("constant Uniforms &uniforms [[buffer(1)]]".to_string());
    }
    for (slot, id) in unit.samplers.iter().enumerate() {
        let (ty, name) = declared(style, unit, *id);
        parameters.push(format!("{} {} [[texture({})]]", ty, name, slot));
        parameters.push(format!("sampler {} [[sampler({})]]", sampler_name(&name), slot));
    }
    for (slot, id) in unit.buffers.iter().enumerate() {
        let (ty, name) = declared(style, unit, *id);
        let space = address_space(unit, *id).as_str();
        let pointer = if unit.variable(*id).array_size == 0 { "&" } else { "*" };
        parameters.push(format!("{} {} {}{} [[buffer({})]]", space, ty, pointer, name, slot + 2));
    }
    for (slot, id) in unit.images.iter().enumerate() {
        parameters.push(format!(
            "texture2d<float, access::write> {} [[texture({})]]",
            unit.name(*id),
            unit.samplers.len() + slot
        ));
    }
    match unit.stage {
        ShaderStage::Compute => {
            for (name, ty, attribute) in COMPUTE_BUILTINS {
                if unit.lookup(name).is_some() {
                    parameters.push(format!("{} {} [[{}]]", ty, name, attribute));
                }
            }
        }
        ShaderStage::Vertex => parameters.push("uint gl_VertexID [[vertex_id]]".to_string()),
        _ => {}
    }
    parameters
}

fn emit_io_structs(out: &mut String, unit: &ShaderUnit, style: &MslStyle) {
    let vertex = unit.stage == ShaderStage::Vertex;
    if !unit.inputs.is_empty() {
        out.push_str("struct Input\n{\n");
        if !vertex {
            out.push_str("\tfloat4 gl_Position [[position]];\n");
        }
        for (location, id) in unit.inputs.iter().enumerate() {
            let (ty, name) = declared(style, unit, *id);
            if vertex {
                out.push_str(&format!("\t{} {} [[attribute({})]];\n", ty, name, location));
            } else {
                out.push_str(&format!("\t{} {} [[user({})]];\n", ty, name, name));
            }
        }
        out.push_str("};\n\n");
    }

    out.push_str("struct Output\n{\n");
    if vertex {
        for id in &unit.outputs {
            let (ty, name) = declared(style, unit, *id);
            if name == POSITION {
                out.push_str(&format!("\t{} {} [[position]];\n", ty, name));
            } else {
                out.push_str(&format!("\t{} {} [[user({})]];\n", ty, name, name));
            }
        }
    } else {
        for (id, slot) in output_slots(unit) {
            let (ty, name) = declared(style, unit, id);
            out.push_str(&format!("\t{} {} [[color({})]];\n", ty, name, slot));
        }
    }
    out.push_str("};\n\n");
}
