//! OpenGL, OpenGL ES and Vulkan GLSL
//!
//! Declarations are re-emitted with explicit locations. On Vulkan every
//! resource also gets a `binding`, counted across the uniform block, samplers
//! and buffers; storage images have their own counter.

use parser::{Builtin, IdentId, Keyword, Precision, TypeId};

use super::{
    array_suffix, declared, emit_functions, emit_macros, emit_structs, emit_workgroup_defines,
    output_slots, print_entry_body, storage, TokenStyle,
};
use crate::analyzer::{ShaderUnit, StorageQualifier};
use crate::context::{BackendFamily, CompileContext};

/// Suffix of the field wrapping a buffer's data inside its block
pub const BUFFER_DATA_SUFFIX: &str = "_inner_data_";

pub(crate) struct GlslStyle;

impl TokenStyle for GlslStyle {
    fn family(&self) -> BackendFamily {
        BackendFamily::Glsl
    }

    fn type_name(&self, unit: &ShaderUnit, ty: TypeId, _precision: Option<Precision>) -> String {
        unit.type_name(ty).to_string()
    }

    fn builtin_name(&self, builtin: Builtin) -> &'static str {
        builtin.as_str()
    }

    fn identifier(&self, unit: &ShaderUnit, id: IdentId, _in_entry: bool) -> String {
        if storage(unit, id) == StorageQualifier::Buffer {
            format!("{}{}", unit.name(id), BUFFER_DATA_SUFFIX)
        } else {
            unit.name(id).to_string()
        }
    }

    fn keyword(&self, unit: &ShaderUnit, keyword: Keyword, _in_entry: bool) -> Option<String> {
        if keyword.is_precision() && unit.force_highp {
            return None;
        }
        Some(keyword.as_str().to_string())
    }
}

fn precision_prefix(precision: Precision) -> &'static str {
    match precision {
        Precision::Medium => "mediump ",
        Precision::Low => "lowp ",
        _ => "",
    }
}

pub fn emit(unit: &ShaderUnit, ctx: &CompileContext) -> String {
    let style = GlslStyle;
    let vulkan = ctx.target.is_vulkan();
    let mut out = String::new();

    emit_macros(&mut out, unit, BackendFamily::Glsl);
    if ctx.is_compute() {
        emit_workgroup_defines(&mut out, ctx);
    }
    emit_structs(&mut out, unit, &style);

    let mut binding = 0u32;

    if !unit.uniforms.is_empty() {
        if vulkan {
            out.push_str(&format!(
                "layout(std140, binding = {}) uniform uniformObject{}\n{{\n",
                binding,
                unit.stage.index()
            ));
        }
        for id in &unit.uniforms {
            let (ty, name) = declared(&style, unit, *id);
            let variable = unit.variable(*id);
            let prefix = precision_prefix(variable.precision);
            let suffix = array_suffix(variable.array_size);
            if vulkan {
                out.push_str(&format!("\t{}{} {}{};\n", prefix, ty, name, suffix));
            } else {
                out.push_str(&format!("uniform {}{} {}{};\n", prefix, ty, name, suffix));
            }
        }
        if vulkan {
            out.push_str("};\n");
        }
        binding += 1;
        out.push('\n');
    }

    for id in &unit.samplers {
        let (ty, name) = declared(&style, unit, *id);
        if vulkan {
            out.push_str(&format!("layout(binding = {}) ", binding));
        }
        let suffix = array_suffix(unit.variable(*id).array_size);
        out.push_str(&format!("uniform {} {}{};\n", ty, name, suffix));
        binding += 1;
    }
    if !unit.samplers.is_empty() {
        out.push('\n');
    }

    for id in &unit.buffers {
        let (ty, name) = declared(&style, unit, *id);
        out.push_str(&format!(
            "layout(std430, binding = {}) buffer {}\n{{\n\t{} {}{}{};\n}};\n\n",
            binding,
            name,
            ty,
            name,
            BUFFER_DATA_SUFFIX,
            array_suffix(unit.variable(*id).array_size)
        ));
        binding += 1;
    }

    for (image_binding, id) in unit.images.iter().enumerate() {
        out.push_str(&format!(
            "layout(rgba8, binding = {}) uniform writeonly image2D {};\n",
            image_binding,
            unit.name(*id)
        ));
    }
    if !unit.images.is_empty() {
        out.push('\n');
    }

    emit_plain(&mut out, &style, unit, &unit.shared, "shared ");
    emit_plain(&mut out, &style, unit, &unit.globals, "");

    for (location, id) in unit.inputs.iter().enumerate() {
        let (ty, name) = declared(&style, unit, *id);
        out.push_str(&format!("layout (location = {}) in {} {};\n", location, ty, name));
    }
    if !unit.inputs.is_empty() {
        out.push('\n');
    }

    let outputs = output_slots(unit);
    for (id, location) in &outputs {
        let (ty, name) = declared(&style, unit, *id);
        out.push_str(&format!("layout (location = {}) out {} {};\n", location, ty, name));
    }
    if !outputs.is_empty() {
        out.push('\n');
    }

    emit_functions(&mut out, unit, &style, |out, entry| {
        if ctx.is_compute() {
            out.push_str(
                "layout (local_size_x = WORKGROUP_SIZE_X, local_size_y = WORKGROUP_SIZE_Y, local_size_z = WORKGROUP_SIZE_Z) in;\n",
            );
        }
        out.push_str("void main()\n{\n\t");
        print_entry_body(out, unit, &style, entry);
        out.push_str("}\n\n");
    });

    out
}

fn emit_plain(out: &mut String, style: &GlslStyle, unit: &ShaderUnit, ids: &[IdentId], qualifier: &str) {
    for id in ids {
        let (ty, name) = declared(style, unit, *id);
        let suffix = array_suffix(unit.variable(*id).array_size);
        out.push_str(&format!("{}{} {}{};\n", qualifier, ty, name, suffix));
    }
    if !ids.is_empty() {
        out.push('\n');
    }
}
