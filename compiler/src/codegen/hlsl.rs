//! Direct3D HLSL (shader model 5)
//!
//! Uniforms collapse into one constant buffer, combined samplers split into a
//! texture plus a `SamplerState`, stage inputs and outputs move into `Input`
//! and `Output` structs, and matrix-vector products become `mul` calls.

use diagnostics::ShaderStage;
use parser::{BaseType, Builtin, IdentId, Keyword, Precision, Symbol, Token, TokenKind, TypeId};

use super::{
    array_suffix, declared, emit_functions, emit_macros, emit_structs, emit_workgroup_defines,
    output_slots, print_entry_body, remove_after, sampler_name, split_sampler_calls, storage,
    TokenStyle, POSITION,
};
use crate::analyzer::{ShaderUnit, StorageQualifier};
use crate::context::{BackendFamily, CompileContext};
use crate::error::CompileError;

pub(crate) struct HlslStyle {
    compute: bool,
}

pub(crate) fn type_name(base: BaseType) -> Option<&'static str> {
    use BaseType::*;
    Some(match base {
        Void => "void",
        Float => "float",
        Vec2 => "float2",
        Vec3 => "float3",
        Vec4 => "float4",
        Mat2 => "float2x2",
        Mat3 => "float3x3",
        Mat4 => "float4x4",
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
        Sampler2D | Sampler2DShadow | SubpassInput => "Texture2D",
        Sampler2DArray | Sampler2DArrayShadow => "Texture2DArray",
        SamplerCube | SamplerCubeShadow => "TextureCube",
        SamplerCubeArray => "TextureCubeArray",
        Image2D => "RWTexture2D<float4>",
        Array | Struct(_) => return None,
    })
}

impl TokenStyle for HlslStyle {
    fn family(&self) -> BackendFamily {
        BackendFamily::Hlsl
    }

    fn type_name(&self, unit: &ShaderUnit, ty: TypeId, _precision: Option<Precision>) -> String {
        match type_name(unit.tables.ty(ty).base()) {
            Some(name) => name.to_string(),
            None => unit.type_name(ty).to_string(),
        }
    }

    fn builtin_name(&self, builtin: Builtin) -> &'static str {
        match builtin {
            Builtin::Mix => "lerp",
            Builtin::Fract => "frac",
            Builtin::MemoryBarrierShared => "GroupMemoryBarrierWithGroupSync",
            Builtin::MemoryBarrier => "AllMemoryBarrier",
            Builtin::Sample => "Sample",
            Builtin::SampleLevel => "SampleLevel",
            Builtin::DiscardFragment => "discard",
            other => other.as_str(),
        }
    }

    fn identifier(&self, unit: &ShaderUnit, id: IdentId, in_entry: bool) -> String {
        let name = unit.name(id);
        let variable = unit.variable(id);
        match variable.storage {
            StorageQualifier::Buffer if variable.array_size == 0 => format!("{}[0]", name),
            StorageQualifier::Out if in_entry => format!("output.{}", name),
            StorageQualifier::In if in_entry => format!("input.{}", name),
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
        Some(format!(", SamplerState {} ", sampler_name(unit.name(id))))
    }

    fn sampler_argument(&self, unit: &ShaderUnit, id: IdentId) -> Option<String> {
        Some(format!(", {} ", sampler_name(unit.name(id))))
    }
}

/// Token rewrites: barriers, texture sampling and matrix products
pub fn rewrite(unit: &mut ShaderUnit) {
    remove_after(
        unit,
        Builtin::Barrier,
        &[Symbol::LeftParen, Symbol::RightParen, Symbol::Semicolon],
        true,
    );
    split_sampler_calls(unit, |builtin| match builtin {
        Builtin::Texture => Some(Builtin::Sample),
        Builtin::TextureLod => Some(Builtin::SampleLevel),
        _ => None,
    });
    rewrite_matrix_products(unit);
}

fn is_matrix_vector_pair(left: BaseType, right: BaseType) -> bool {
    use BaseType::*;
    matches!(
        (left, right),
        (Mat4, Vec4) | (Vec4, Mat4) | (Mat3, Vec3) | (Vec3, Mat3)
    )
}

/// `a * b` on a matrix and a vector becomes `mul ( a , b )`
///
/// Operands are swapped to account for the row-major convention unless one
/// of them is a uniform, whose layout is already transposed on upload.
fn rewrite_matrix_products(unit: &mut ShaderUnit) {
    let mut i = 1;
    while i + 1 < unit.tokens.len() {
        if !unit.tokens[i].is_symbol(Symbol::Star) {
            i += 1;
            continue;
        }
        let (Some(left), Some(right)) = (unit.tokens[i - 1].identifier(), unit.tokens[i + 1].identifier()) else {
            i += 1;
            continue;
        };
        let member_access = (i >= 2 && unit.tokens[i - 2].is_symbol(Symbol::Dot))
            || unit.tokens.get(i + 2).is_some_and(|t| {
                t.is_symbol(Symbol::Dot) || t.is_symbol(Symbol::LeftBracket) || t.is_symbol(Symbol::LeftParen)
            });
        let shapes = unit
            .type_of(left)
            .zip(unit.type_of(right))
            .map(|(l, r)| (l.base(), r.base()));
        let Some((left_base, right_base)) = shapes else {
            i += 1;
            continue;
        };
        if member_access || !is_matrix_vector_pair(left_base, right_base) {
            i += 1;
            continue;
        }

        let is_uniform = |id: IdentId| storage(unit, id) == StorageQualifier::Uniform;
        let (first, second) = if !is_uniform(left) && !is_uniform(right) {
            (right, left)
        } else {
            (left, right)
        };

        let origin = unit.tokens[i - 1];
        let at = |kind: TokenKind| Token::new(kind, origin.line, origin.column);
        let call = [
            at(TokenKind::Builtin(Builtin::Mul)),
            at(TokenKind::Symbol(Symbol::LeftParen)),
            at(TokenKind::Identifier(first)),
            at(TokenKind::Symbol(Symbol::Comma)),
            at(TokenKind::Identifier(second)),
            at(TokenKind::Symbol(Symbol::RightParen)),
        ];
        unit.tokens.splice(i - 1..i + 2, call);
        i += call.len() - 1;
    }
}

pub fn emit(unit: &ShaderUnit, ctx: &CompileContext) -> Result<String, CompileError> {
    let stage = unit.stage;
    if !matches!(stage, ShaderStage::Vertex | ShaderStage::Fragment | ShaderStage::Compute) {
        return Err(CompileError::UnsupportedStage { stage, backend: "HLSL" });
    }
    let compute = stage == ShaderStage::Compute;
    let style = HlslStyle { compute };
    let mut out = String::new();

    emit_macros(&mut out, unit, BackendFamily::Hlsl);
    if compute {
        emit_workgroup_defines(&mut out, ctx);
    }
    emit_structs(&mut out, unit, &style);

    if !unit.uniforms.is_empty() || compute {
        out.push_str("cbuffer cb0 : register(b0)\n{\n");
        for id in &unit.uniforms {
            let (ty, name) = declared(&style, unit, *id);
            let suffix = array_suffix(unit.variable(*id).array_size);
            out.push_str(&format!("\t{} {}{};\n", ty, name, suffix));
        }
        if compute {
            out.push_str("\tuint4 gl_NumWorkGroups;\n");
        }
        out.push_str("};\n\n");
    }

    for (register, id) in unit.samplers.iter().enumerate() {
        let (ty, name) = declared(&style, unit, *id);
        out.push_str(&format!(
            "SamplerState {} : register(s{});\n{} {} : register(t{});\n",
            sampler_name(&name),
            register,
            ty,
            name,
            register
        ));
    }
    if !unit.samplers.is_empty() {
        out.push('\n');
    }

    for (index, id) in unit.buffers.iter().enumerate() {
        let (ty, name) = declared(&style, unit, *id);
        if stage == ShaderStage::Fragment {
            out.push_str(&format!(
                "StructuredBuffer<{}> {} : register(t{});\n",
                ty,
                name,
                unit.samplers.len() + index
            ));
        } else {
            out.push_str(&format!("RWStructuredBuffer<{}> {} : register(u{});\n", ty, name, index));
        }
    }
    for (index, id) in unit.images.iter().enumerate() {
        out.push_str(&format!(
            "RWTexture2D<float4> {} : register(u{});\n",
            unit.name(*id),
            unit.buffers.len() + index
        ));
    }
    if !unit.buffers.is_empty() || !unit.images.is_empty() {
        out.push('\n');
    }

    for (ids, qualifier) in [(&unit.shared, "groupshared"), (&unit.globals, "static")] {
        for id in ids {
            let (ty, name) = declared(&style, unit, *id);
            let suffix = array_suffix(unit.variable(*id).array_size);
            out.push_str(&format!("{} {} {}{};\n", qualifier, ty, name, suffix));
        }
        if !ids.is_empty() {
            out.push('\n');
        }
    }

    if !compute {
        emit_io_structs(&mut out, unit, &style);
    }

    emit_functions(&mut out, unit, &style, |out, entry| {
        out.push_str(match stage {
            ShaderStage::Vertex => {
                "Output vertex_main( Input input, uint gl_VertexID : SV_VertexID)\n{\n\tOutput output = (Output)0;\n\t"
            }
            ShaderStage::Fragment => "Output fragment_main( Input input)\n{\n\tOutput output = (Output)0;\n\t",
            _ => {
                "[numthreads(WORKGROUP_SIZE_X, WORKGROUP_SIZE_Y, WORKGROUP_SIZE_Z)]\nvoid compute_main(uint3 gl_WorkGroupID : SV_GroupID, uint3 gl_LocalInvocationID : SV_GroupThreadID, uint gl_LocalInvocationIndex : SV_GroupIndex, uint3 gl_GlobalInvocationID : SV_DispatchThreadID)\n{\n\t"
            }
        });
        print_entry_body(out, unit, &style, entry);
        if !compute {
            out.push_str("return output;\n");
        }
        out.push_str("}\n\n");
    });

    Ok(out)
}

fn emit_io_structs(out: &mut String, unit: &ShaderUnit, style: &HlslStyle) {
    out.push_str("struct Input\n{\n");
    if unit.stage == ShaderStage::Fragment {
        out.push_str("\tfloat4 gl_Position:SV_POSITION;\n");
    }
    for id in &unit.inputs {
        let (ty, name) = declared(style, unit, *id);
        out.push_str(&format!("\t{} {}:{};\n", ty, name, name));
    }
    out.push_str("};\n\n");

    out.push_str("struct Output\n{\n");
    if unit.stage == ShaderStage::Vertex {
        for id in &unit.outputs {
            let (ty, name) = declared(style, unit, *id);
            if name == POSITION {
                out.push_str(&format!("\t{} {}:SV_POSITION;\n", ty, name));
            } else {
                out.push_str(&format!("\t{} {}:{};\n", ty, name, name));
            }
        }
    } else {
        for (id, slot) in output_slots(unit) {
            let (ty, name) = declared(style, unit, id);
            out.push_str(&format!("\t{} {}:SV_TARGET{};\n", ty, name, slot));
        }
    }
    out.push_str("};\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::test_support::analyzed;
    use parser::token_text;

    fn rewritten(stage: ShaderStage, source: &str) -> String {
        let mut unit = analyzed(stage, source);
        rewrite(&mut unit);
        unit.tokens
            .iter()
            .map(|t| token_text(t, &unit.tables))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_mul_keeps_uniform_operand_first() {
        let text = rewritten(
            ShaderStage::Vertex,
            "uniform mat4 M;\nin vec4 P;\nvoid main() { out_pos = M * P; }\n",
        );
        assert!(text.contains("out_pos = mul ( M , P ) ;"), "{}", text);
    }

    #[test]
    fn test_mul_swaps_local_operands() {
        let text = rewritten(
            ShaderStage::Vertex,
            "void main() { mat3 m; vec3 v; vec3 r = m * v; vec3 s = v * m; }\n",
        );
        assert!(text.contains("r = mul ( v , m ) ;"), "{}", text);
        assert!(text.contains("s = mul ( m , v ) ;"), "{}", text);
    }

    #[test]
    fn test_mul_between_uniforms_keeps_order() {
        let text = rewritten(
            ShaderStage::Vertex,
            "uniform mat4 M;\nuniform vec4 V;\nvoid main() { vec4 a = M * V; vec4 b = V * M; }\n",
        );
        assert!(text.contains("a = mul ( M , V ) ;"), "{}", text);
        assert!(text.contains("b = mul ( V , M ) ;"), "{}", text);
    }

    #[test]
    fn test_mul_with_uniform_on_the_right_keeps_order() {
        let text = rewritten(
            ShaderStage::Vertex,
            "uniform mat3 N;\nvoid main() { vec3 n; vec3 r = n * N; }\n",
        );
        assert!(text.contains("r = mul ( n , N ) ;"), "{}", text);
    }

    #[test]
    fn test_mat2_products_are_untouched() {
        let text = rewritten(ShaderStage::Vertex, "void main() { mat2 m; vec2 v; vec2 r = m * v; }\n");
        assert!(text.contains("r = m * v ;"), "{}", text);
        assert!(!text.contains("mul"));
    }

    #[test]
    fn test_non_identifier_operands_are_untouched() {
        let text = rewritten(
            ShaderStage::Vertex,
            "void main() { mat4 m; vec4 v; vec4 a = m * v.xyzw; vec4 b = m * v[0]; vec4 c = m * vec4(1.0); }\n",
        );
        assert!(text.contains("a = m * v . xyzw ;"), "{}", text);
        assert!(text.contains("b = m * v [ 0 ] ;"), "{}", text);
        assert!(text.contains("c = m * vec4 ( 1.0 ) ;"), "{}", text);
        assert!(!text.contains("mul"));
    }

    #[test]
    fn test_scalar_products_are_untouched() {
        let text = rewritten(ShaderStage::Vertex, "void main() { float a; vec4 b; vec4 c = a * b; }\n");
        assert!(text.contains("c = a * b ;"));
    }

    #[test]
    fn test_texture_split_and_barrier_removal() {
        let text = rewritten(
            ShaderStage::Compute,
            "uniform sampler2D albedo;\nvoid main() { barrier(); vec4 c = textureLod(albedo, uv, 0.0); }\n",
        );
        assert!(!text.contains("barrier"));
        assert!(text.contains("albedo . sampleLevel ( albedo_sampler , uv , 0.0 )"), "{}", text);
    }
}
