//! Target selection and the immutable per-stage compilation context

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use diagnostics::{FileId, ShaderStage};
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// Graphics API a shader is translated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    #[serde(rename = "opengl")]
    OpenGl,
    #[serde(rename = "opengles")]
    OpenGlEs,
    #[serde(rename = "vulkan")]
    Vulkan,
    #[serde(rename = "d3d11")]
    Direct3D11,
    #[serde(rename = "d3d12")]
    Direct3D12,
    #[serde(rename = "metal_macos")]
    MetalMacos,
    #[serde(rename = "metal_ios")]
    MetalIos,
}

/// Generator family shared by several targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendFamily {
    Glsl,
    Hlsl,
    Msl,
}

impl BackendFamily {
    pub fn name(self) -> &'static str {
        match self {
            BackendFamily::Glsl => "GLSL",
            BackendFamily::Hlsl => "HLSL",
            BackendFamily::Msl => "Metal",
        }
    }
}

impl Target {
    pub const ALL: [Target; 7] = [
        Target::OpenGl,
        Target::OpenGlEs,
        Target::Vulkan,
        Target::Direct3D11,
        Target::Direct3D12,
        Target::MetalMacos,
        Target::MetalIos,
    ];

    pub fn family(self) -> BackendFamily {
        match self {
            Target::OpenGl | Target::OpenGlEs | Target::Vulkan => BackendFamily::Glsl,
            Target::Direct3D11 | Target::Direct3D12 => BackendFamily::Hlsl,
            Target::MetalMacos | Target::MetalIos => BackendFamily::Msl,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Target::OpenGl => "opengl",
            Target::OpenGlEs => "opengles",
            Target::Vulkan => "vulkan",
            Target::Direct3D11 => "d3d11",
            Target::Direct3D12 => "d3d12",
            Target::MetalMacos => "metal_macos",
            Target::MetalIos => "metal_ios",
        }
    }

    pub fn is_vulkan(self) -> bool {
        self == Target::Vulkan
    }

    pub fn is_gles(self) -> bool {
        self == Target::OpenGlEs
    }

    /// Header prepended to every generated stage unless the factory overrides it
    pub fn default_global_header(self) -> &'static str {
        match self {
            Target::OpenGl => "#version 430 core\n",
            Target::OpenGlEs => "#version 310 es\nprecision highp float;\n",
            Target::Vulkan => "#version 450\n",
            _ => "",
        }
    }

    /// Name of the generated entry function
    pub fn entry_point(self, stage: ShaderStage) -> &'static str {
        match (self.family(), stage) {
            (BackendFamily::Glsl, _) => "main",
            (_, ShaderStage::Vertex) => "vertex_main",
            (_, ShaderStage::Fragment) => "fragment_main",
            (_, ShaderStage::Compute) => "compute_main",
            _ => "main",
        }
    }

    /// Compiler profile handed to the platform shader compiler
    pub fn stage_profile(self, stage: ShaderStage) -> Option<&'static str> {
        if self.family() != BackendFamily::Hlsl {
            return None;
        }
        match stage {
            ShaderStage::Vertex => Some("vs_5_0"),
            ShaderStage::Fragment => Some("ps_5_0"),
            ShaderStage::Compute => Some("cs_5_0"),
            _ => None,
        }
    }

    /// Version or profile string reported alongside generated source
    pub fn version(self, stage: ShaderStage) -> Option<&'static str> {
        match self {
            Target::OpenGl => Some("430 core"),
            Target::OpenGlEs => Some("310 es"),
            Target::Vulkan => Some("450"),
            Target::Direct3D11 | Target::Direct3D12 => self.stage_profile(stage),
            Target::MetalMacos | Target::MetalIos => None,
        }
    }

    /// Stages the generator of this target can translate
    pub fn supports_stage(self, stage: ShaderStage) -> bool {
        match stage {
            ShaderStage::Vertex | ShaderStage::Fragment | ShaderStage::Compute => true,
            ShaderStage::Geometry => self.family() == BackendFamily::Glsl,
            ShaderStage::TessControl | ShaderStage::TessEval => false,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        let target = match lowered.as_str() {
            "gl" | "opengl" => Target::OpenGl,
            "gles" | "opengles" => Target::OpenGlEs,
            "vk" | "vulkan" => Target::Vulkan,
            "d3d11" | "direct3d11" => Target::Direct3D11,
            "d3d12" | "direct3d12" => Target::Direct3D12,
            "metal" | "metal_macos" => Target::MetalMacos,
            "metal_ios" => Target::MetalIos,
            _ => return Err(format!("unknown target '{}'", s)),
        };
        Ok(target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupSize {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn is_valid(&self) -> bool {
        self.x > 0 && self.y > 0 && self.z > 0
    }

    pub fn as_array(&self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// Everything a stage compile needs to know; never mutated once built
#[derive(Debug, Clone)]
pub struct CompileContext {
    pub target: Target,
    pub stage: ShaderStage,
    pub workgroup_size: WorkgroupSize,
    pub treat_warnings_as_errors: bool,
    pub force_highp: bool,
    /// Defines applied by the preprocessor before the first line
    pub defines: BTreeMap<String, String>,
    /// File the source text is attributed to in diagnostics
    pub file_id: FileId,
}

impl CompileContext {
    /// Build a context; compute stages need a non-zero workgroup size
    pub fn new(
        target: Target,
        stage: ShaderStage,
        workgroup_size: Option<WorkgroupSize>,
    ) -> Result<Self, CompileError> {
        let workgroup_size = workgroup_size.unwrap_or_default();
        if stage == ShaderStage::Compute && !workgroup_size.is_valid() {
            return Err(CompileError::InvalidWorkgroupSize(workgroup_size));
        }
        Ok(Self {
            target,
            stage,
            workgroup_size,
            treat_warnings_as_errors: false,
            force_highp: false,
            defines: BTreeMap::new(),
            file_id: FileId::new(0),
        })
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.treat_warnings_as_errors = enabled;
        self
    }

    pub fn with_force_highp(mut self, enabled: bool) -> Self {
        self.force_highp = enabled;
        self
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }

    pub fn with_defines(mut self, defines: BTreeMap<String, String>) -> Self {
        self.defines.extend(defines);
        self
    }

    pub fn with_file_id(mut self, file_id: FileId) -> Self {
        self.file_id = file_id;
        self
    }

    pub fn family(&self) -> BackendFamily {
        self.target.family()
    }

    pub fn is_compute(&self) -> bool {
        self.stage == ShaderStage::Compute
    }

    pub fn is_fragment(&self) -> bool {
        self.stage == ShaderStage::Fragment
    }

    pub fn is_vertex(&self) -> bool {
        self.stage == ShaderStage::Vertex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_requires_workgroup_size() {
        let missing = CompileContext::new(Target::Vulkan, ShaderStage::Compute, None);
        assert!(matches!(missing, Err(CompileError::InvalidWorkgroupSize(_))));

        let zero = CompileContext::new(Target::Vulkan, ShaderStage::Compute, Some(WorkgroupSize::new(8, 0, 1)));
        assert!(zero.is_err());

        let ok = CompileContext::new(Target::Vulkan, ShaderStage::Compute, Some(WorkgroupSize::new(8, 8, 1)));
        assert!(ok.is_ok());
        assert!(CompileContext::new(Target::Vulkan, ShaderStage::Vertex, None).is_ok());
    }

    #[test]
    fn test_target_tables() {
        assert_eq!(Target::Direct3D11.entry_point(ShaderStage::Fragment), "fragment_main");
        assert_eq!(Target::Direct3D12.stage_profile(ShaderStage::Compute), Some("cs_5_0"));
        assert_eq!(Target::MetalIos.stage_profile(ShaderStage::Vertex), None);
        assert_eq!(Target::OpenGlEs.entry_point(ShaderStage::Vertex), "main");
        assert!(!Target::MetalMacos.supports_stage(ShaderStage::Geometry));
        assert_eq!("vk".parse::<Target>(), Ok(Target::Vulkan));
    }
}
