//! Translator from the shading dialect to GLSL, Vulkan GLSL, HLSL and Metal
//!
//! [`pipeline::compile_stage`] translates a single stage source for a
//! [`CompileContext`]. [`ShaderFactory`] builds stage sources from
//! [`ShaderDescriptor`]s and caches the results.

pub mod analyzer;
pub mod cache;
pub mod codegen;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod error_codes;
pub mod factory;
pub mod logging;
pub mod pipeline;
pub mod reflection;

pub use cache::{CacheStats, CompileCache, PipelineCache, PipelineKey, ShaderCache};
pub use config::FactoryConfig;
pub use context::{BackendFamily, CompileContext, Target, WorkgroupSize};
pub use descriptor::{common_uniforms, ShaderDescriptor, UniformBinding, UniformGroup};
pub use error::{CompileError, FactoryError};
pub use factory::{AssembledStage, CompiledShaderSet, ShaderFactory};
pub use pipeline::{compile_stage, StageOutput, MAX_FRAG_DATA};
pub use reflection::{Reflection, ResourceBinding, ResourceFormat, VertexAttribute, VertexFormat};
