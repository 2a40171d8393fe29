//! Shader descriptors: what a shader is built from
//!
//! A descriptor names the file of every active stage, the headers included
//! before them, the defines injected ahead of the headers and, for compute
//! shaders, the workgroup size. Descriptors compare equal when they would
//! assemble the same sources, regardless of their name.

use std::collections::BTreeMap;

use diagnostics::ShaderStage;
use serde::{Deserialize, Serialize};

use crate::context::WorkgroupSize;

/// Digits after the decimal point of float and half defines
const FLOAT_LITERAL_PRECISION: usize = 11;

/// How often the host updates a uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniformGroup {
    PerDraw,
    PerRendererChange,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniformBinding {
    pub name: String,
    pub group: UniformGroup,
}

impl UniformBinding {
    pub fn new(name: impl Into<String>, group: UniformGroup) -> Self {
        Self {
            name: name.into(),
            group,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "DescriptorFile", into = "DescriptorFile")]
pub struct ShaderDescriptor {
    name: String,
    /// Indexed by [`ShaderStage::index`]; empty for absent stages
    filenames: [String; 6],
    header_files: Vec<String>,
    defines: BTreeMap<String, String>,
    uniforms: Vec<UniformBinding>,
    workgroup_size: [u32; 3],
}

impl ShaderDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_fragment(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::new().set_vs(vertex).set_fs(fragment)
    }

    pub fn compute(compute: impl Into<String>) -> Self {
        Self::new().set_cs(compute)
    }

    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_file(mut self, stage: ShaderStage, filename: impl Into<String>) -> Self {
        self.filenames[stage.index()] = filename.into();
        self
    }

    pub fn set_vs(self, filename: impl Into<String>) -> Self {
        self.set_file(ShaderStage::Vertex, filename)
    }

    pub fn set_tcs(self, filename: impl Into<String>) -> Self {
        self.set_file(ShaderStage::TessControl, filename)
    }

    pub fn set_tes(self, filename: impl Into<String>) -> Self {
        self.set_file(ShaderStage::TessEval, filename)
    }

    pub fn set_gs(self, filename: impl Into<String>) -> Self {
        self.set_file(ShaderStage::Geometry, filename)
    }

    pub fn set_fs(self, filename: impl Into<String>) -> Self {
        self.set_file(ShaderStage::Fragment, filename)
    }

    pub fn set_cs(self, filename: impl Into<String>) -> Self {
        self.set_file(ShaderStage::Compute, filename)
    }

    pub fn add_header_file(mut self, filename: impl Into<String>) -> Self {
        self.header_files.push(filename.into());
        self
    }

    /// `#define name 1`
    pub fn add_define(self, name: impl Into<String>) -> Self {
        self.add_define_string(name, "1")
    }

    pub fn add_define_int(self, name: impl Into<String>, value: i32) -> Self {
        self.add_define_string(name, value.to_string())
    }

    pub fn add_define_uint(self, name: impl Into<String>, value: u32) -> Self {
        self.add_define_string(name, format!("{}u", value))
    }

    pub fn add_define_float(self, name: impl Into<String>, value: f32) -> Self {
        self.add_define_string(name, format!("{:.*}", FLOAT_LITERAL_PRECISION, value))
    }

    pub fn add_define_half(self, name: impl Into<String>, value: f32) -> Self {
        self.add_define_string(name, format!("{:.*}h", FLOAT_LITERAL_PRECISION, value))
    }

    pub fn add_define_vec2(self, name: impl Into<String>, x: f32, y: f32) -> Self {
        let p = FLOAT_LITERAL_PRECISION;
        self.add_define_string(name, format!("float2({:.*}, {:.*})", p, x, p, y))
    }

    /// Later values replace earlier ones for the same name
    pub fn add_define_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }

    pub fn set_workgroup_size(mut self, x: u32, y: u32, z: u32) -> Self {
        self.workgroup_size = [x, y, z];
        self
    }

    pub fn add_uniform(mut self, name: impl Into<String>, group: UniformGroup) -> Self {
        self.uniforms.push(UniformBinding::new(name, group));
        self
    }

    pub fn set_uniforms(mut self, uniforms: Vec<UniformBinding>) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filename(&self, stage: ShaderStage) -> &str {
        &self.filenames[stage.index()]
    }

    pub fn has_stage(&self, stage: ShaderStage) -> bool {
        !self.filename(stage).is_empty()
    }

    /// Stages with a file, in pipeline order
    pub fn stages(&self) -> impl Iterator<Item = ShaderStage> + '_ {
        ShaderStage::ALL.into_iter().filter(|stage| self.has_stage(*stage))
    }

    pub fn header_files(&self) -> &[String] {
        &self.header_files
    }

    pub fn defines(&self) -> &BTreeMap<String, String> {
        &self.defines
    }

    pub fn uniforms(&self) -> &[UniformBinding] {
        &self.uniforms
    }

    pub fn workgroup_size(&self) -> WorkgroupSize {
        let [x, y, z] = self.workgroup_size;
        WorkgroupSize::new(x, y, z)
    }

    /// One `#define NAME VALUE` line per define, sorted by name
    pub fn defines_string(&self) -> String {
        render_defines(&self.defines)
    }

    /// Relative path the descriptor is persisted under
    pub fn parameter_filename(&self) -> String {
        format!("engine/{}.json", self.name)
    }
}

pub(crate) fn render_defines(defines: &BTreeMap<String, String>) -> String {
    defines
        .iter()
        .map(|(name, value)| format!("#define {} {}\n", name, value))
        .collect()
}

impl PartialEq for ShaderDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.filenames == other.filenames
            && self.header_files == other.header_files
            && self.defines_string() == other.defines_string()
            && self.uniforms == other.uniforms
            && self.workgroup_size == other.workgroup_size
    }
}

impl Eq for ShaderDescriptor {}

/// Persisted form; uniforms are supplied by code, not by files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct DescriptorFile {
    name: String,
    shader_vs: String,
    shader_tcs: String,
    shader_tes: String,
    shader_gs: String,
    shader_fs: String,
    shader_cs: String,
    header_files: Vec<String>,
    defines: BTreeMap<String, String>,
    compute_workgroup_size_x: u32,
    compute_workgroup_size_y: u32,
    compute_workgroup_size_z: u32,
}

impl From<DescriptorFile> for ShaderDescriptor {
    fn from(file: DescriptorFile) -> Self {
        Self {
            name: file.name,
            filenames: [
                file.shader_vs,
                file.shader_tcs,
                file.shader_tes,
                file.shader_gs,
                file.shader_fs,
                file.shader_cs,
            ],
            header_files: file.header_files,
            defines: file.defines,
            uniforms: Vec::new(),
            workgroup_size: [
                file.compute_workgroup_size_x,
                file.compute_workgroup_size_y,
                file.compute_workgroup_size_z,
            ],
        }
    }
}

impl From<ShaderDescriptor> for DescriptorFile {
    fn from(descriptor: ShaderDescriptor) -> Self {
        let [shader_vs, shader_tcs, shader_tes, shader_gs, shader_fs, shader_cs] = descriptor.filenames;
        let [x, y, z] = descriptor.workgroup_size;
        Self {
            name: descriptor.name,
            shader_vs,
            shader_tcs,
            shader_tes,
            shader_gs,
            shader_fs,
            shader_cs,
            header_files: descriptor.header_files,
            defines: descriptor.defines,
            compute_workgroup_size_x: x,
            compute_workgroup_size_y: y,
            compute_workgroup_size_z: z,
        }
    }
}

/// Resource list used when a descriptor names none
pub fn common_uniforms() -> Vec<UniformBinding> {
    use UniformGroup::{PerDraw, PerRendererChange};

    const COMMON: &[(&str, UniformGroup)] = &[
        // frame
        ("time", PerRendererChange),
        ("delta_time", PerRendererChange),
        // camera
        ("view_pos", PerRendererChange),
        ("view_dir", PerRendererChange),
        ("view", PerRendererChange),
        ("vp", PerRendererChange),
        ("prev_vp", PerRendererChange),
        ("vp_inv", PerRendererChange),
        ("depth_parameters", PerRendererChange),
        ("frustum_planes", PerRendererChange),
        ("corners", PerRendererChange),
        // mesh
        ("model", PerDraw),
        ("inv-model", PerDraw),
        ("mv", PerDraw),
        ("mvp", PerDraw),
        ("prev_mvp", PerDraw),
        ("bones", PerDraw),
        ("prev_bones", PerDraw),
        // material
        ("color_texture", PerDraw),
        ("normal_texture", PerDraw),
        ("specular_texture", PerDraw),
        ("emissive_texture", PerDraw),
        ("emissive_intensity", PerDraw),
        ("alpha_test_threshold", PerDraw),
        ("roughness", PerDraw),
        // lights
        ("light_vp", PerDraw),
        ("light_pos", PerDraw),
        ("light_dir", PerDraw),
        ("light_color", PerDraw),
        ("spot_cos", PerDraw),
        ("attenuation_parameters", PerDraw),
        ("sky_color", PerRendererChange),
        ("ground_color", PerRendererChange),
        // shadow
        ("shadow_map", PerDraw),
        ("shadow_matrix", PerDraw),
        ("shadow_matrices", PerRendererChange),
        ("shadow_frustum_distances", PerRendererChange),
        // post processing
        ("hdr_exposure", PerRendererChange),
        ("bloom_parameters", PerRendererChange),
        ("fog_color", PerRendererChange),
    ];

    COMMON
        .iter()
        .map(|(name, group)| UniformBinding::new(*name, *group))
        .collect()
}
