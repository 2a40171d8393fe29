//! Resource reflection for pipeline creation
//!
//! Describes the vertex attributes and bound resources of a translated stage
//! so a host can build a pipeline object without parsing the generated code.

use diagnostics::ShaderStage;
use parser::{BaseType, IdentId, TypeClass};
use serde::{Deserialize, Serialize};

use crate::analyzer::ShaderUnit;
use crate::codegen::glsl::BUFFER_DATA_SUFFIX;
use crate::context::{BackendFamily, Target};
use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexFormat {
    #[serde(rename = "R32_FLOAT")]
    R32Float,
    #[serde(rename = "R32G32_FLOAT")]
    R32G32Float,
    #[serde(rename = "R32G32B32_FLOAT")]
    R32G32B32Float,
    #[serde(rename = "R32G32B32A32_FLOAT")]
    R32G32B32A32Float,
}

impl VertexFormat {
    fn from_base(base: BaseType) -> Option<Self> {
        Some(match base {
            BaseType::Float => VertexFormat::R32Float,
            BaseType::Vec2 => VertexFormat::R32G32Float,
            BaseType::Vec3 => VertexFormat::R32G32B32Float,
            BaseType::Vec4 => VertexFormat::R32G32B32A32Float,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceFormat {
    Float,
    Float2,
    Float4,
    Float16,
    Int,
    Int2,
    Int4,
    Uint,
    Uint2,
    Uint4,
    Texture,
    Buffer,
    Undefined,
}

impl ResourceFormat {
    fn uniform(base: BaseType) -> Self {
        match base {
            BaseType::Float => ResourceFormat::Float,
            BaseType::Vec2 => ResourceFormat::Float2,
            BaseType::Vec4 => ResourceFormat::Float4,
            BaseType::Mat4 => ResourceFormat::Float16,
            BaseType::Int => ResourceFormat::Int,
            BaseType::Int2 => ResourceFormat::Int2,
            BaseType::Int4 => ResourceFormat::Int4,
            BaseType::Uint => ResourceFormat::Uint,
            BaseType::Uint2 => ResourceFormat::Uint2,
            BaseType::Uint4 => ResourceFormat::Uint4,
            other => {
                log::debug!("no reflection format for uniform type {:?}", other);
                ResourceFormat::Undefined
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub name: String,
    pub format: VertexFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBinding {
    pub name: String,
    pub format: ResourceFormat,
    /// Array length, 1 for non-arrays
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub attributes: Vec<VertexAttribute>,
    pub resources: Vec<ResourceBinding>,
}

impl Reflection {
    pub fn resource(&self, name: &str) -> Option<&ResourceBinding> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Whether a compiled stage carries reflection on `target`
pub fn wants_reflection(target: Target, stage: ShaderStage) -> bool {
    match target.family() {
        BackendFamily::Glsl => true,
        BackendFamily::Hlsl | BackendFamily::Msl => stage == ShaderStage::Vertex,
    }
}

fn element_count(unit: &ShaderUnit, id: IdentId) -> u32 {
    match unit.variable(id).array_size {
        n if n > 0 => n as u32,
        _ => 1,
    }
}

pub fn reflect(unit: &ShaderUnit, target: Target) -> Result<Reflection, CompileError> {
    let mut reflection = Reflection::default();

    if unit.stage == ShaderStage::Vertex {
        for id in &unit.inputs {
            let Some(ty) = unit.type_of(*id) else {
                continue;
            };
            let format = VertexFormat::from_base(ty.base()).ok_or_else(|| CompileError::UnsupportedType {
                name: unit.name(*id).to_string(),
                ty: ty.to_string(),
                context: "vertex attribute",
                span: declaration_span(unit, *id),
            })?;
            reflection.attributes.push(VertexAttribute {
                name: unit.name(*id).to_string(),
                format,
            });
        }
    }

    for id in &unit.uniforms {
        let Some(ty) = unit.type_of(*id) else {
            continue;
        };
        if ty.class() == TypeClass::SubpassInput {
            continue;
        }
        reflection.resources.push(ResourceBinding {
            name: unit.name(*id).to_string(),
            format: ResourceFormat::uniform(ty.base()),
            count: element_count(unit, *id),
        });
    }
    for id in &unit.samplers {
        reflection.resources.push(ResourceBinding {
            name: unit.name(*id).to_string(),
            format: ResourceFormat::Texture,
            count: element_count(unit, *id),
        });
    }
    for id in &unit.buffers {
        // GL reflection reports the block member, which carries the data suffix
        let name = match target.family() {
            BackendFamily::Glsl => format!("{}{}", unit.name(*id), BUFFER_DATA_SUFFIX),
            _ => unit.name(*id).to_string(),
        };
        reflection.resources.push(ResourceBinding {
            name,
            format: ResourceFormat::Buffer,
            count: 1,
        });
    }
    for id in &unit.images {
        reflection.resources.push(ResourceBinding {
            name: unit.name(*id).to_string(),
            format: ResourceFormat::Texture,
            count: element_count(unit, *id),
        });
    }

    Ok(reflection)
}

fn declaration_span(unit: &ShaderUnit, id: IdentId) -> diagnostics::SourceSpan {
    unit.tokens
        .iter()
        .position(|t| t.identifier() == Some(id))
        .map(|index| unit.span_at(index))
        .unwrap_or_else(diagnostics::SourceSpan::dummy)
}
