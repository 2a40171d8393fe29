//! Shader factory: descriptor registry, source assembly and cached compilation
//!
//! A stage source is assembled from, in order: the `force_highp;` line, the
//! global defines, `#define TYPE_<stage> 1`, the compute workgroup defines,
//! the descriptor defines, the global header files, the descriptor header
//! files and finally the stage file. The assembled text is the cache key.
//!
//! Vulkan compiles every stage of a descriptor together and caches the whole
//! set; the other targets cache stage by stage. A failing stage fails the
//! whole descriptor and none of its stages is cached.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::RwLock;
use rayon::prelude::*;

use diagnostics::{AssembledSource, ShaderStage, SourceMap};

use crate::cache::{CacheStats, PipelineCache, PipelineKey, ShaderCache};
use crate::config::FactoryConfig;
use crate::context::{CompileContext, Target};
use crate::descriptor::{common_uniforms, render_defines, ShaderDescriptor, UniformBinding};
use crate::error::FactoryError;
use crate::pipeline::{compile_stage, StageOutput};

/// Diagnostic name of the generated define block
const DEFINES_NAME: &str = "<defines>";

/// Lines a GLES tessellation stage needs right after `#version`
const GLES_TESSELLATION_EXTENSIONS: &str =
    "#extension GL_EXT_tessellation_shader : enable\n#extension GL_OES_tessellation_shader : enable\n";

/// Every translated stage of one descriptor
#[derive(Debug, Clone)]
pub struct CompiledShaderSet {
    pub code: u32,
    pub name: String,
    /// Active stages in pipeline order
    pub stages: Vec<StageOutput>,
    pub bindings: Vec<UniformBinding>,
}

impl CompiledShaderSet {
    pub fn stage(&self, stage: ShaderStage) -> Option<&StageOutput> {
        self.stages.iter().find(|output| output.stage == stage)
    }
}

/// Source of one stage, ready to compile
#[derive(Debug, Clone)]
pub struct AssembledStage {
    pub stage: ShaderStage,
    pub source: AssembledSource,
    pub files: SourceMap,
}

impl AssembledStage {
    pub fn text(&self) -> &str {
        self.source.text()
    }
}

#[derive(Debug, Default)]
struct Registry {
    descriptors: BTreeMap<u32, ShaderDescriptor>,
    next_code: u32,
}

pub struct ShaderFactory {
    target: Target,
    directories: Vec<String>,
    global_header: String,
    global_header_files: Vec<String>,
    global_defines: BTreeMap<String, String>,
    force_highp: bool,
    treat_warnings_as_errors: bool,
    registry: RwLock<Registry>,
    shader_cache: ShaderCache,
    pipeline_cache: PipelineCache,
}

impl ShaderFactory {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            directories: Vec::new(),
            global_header: target.default_global_header().to_string(),
            global_header_files: Vec::new(),
            global_defines: BTreeMap::new(),
            force_highp: false,
            treat_warnings_as_errors: false,
            registry: RwLock::new(Registry {
                descriptors: BTreeMap::new(),
                next_code: 1,
            }),
            shader_cache: ShaderCache::new(),
            pipeline_cache: PipelineCache::new(),
        }
    }

    pub fn from_config(config: &FactoryConfig) -> Self {
        let mut factory = Self::new(config.target);
        for directory in &config.directories {
            factory.add_directory(directory);
        }
        if let Some(header) = &config.global_header {
            factory.set_global_header(header.clone());
        }
        for file in &config.global_header_files {
            factory.add_global_header_file(file.clone());
        }
        for (name, value) in &config.global_int_defines {
            factory.add_global_define_int(name.clone(), *value);
        }
        for (name, value) in &config.global_float_defines {
            factory.add_global_define_float(name.clone(), *value);
        }
        factory.set_force_highp(config.force_highp);
        factory.set_treat_warnings_as_errors(config.treat_warnings_as_errors);
        factory
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Add a search directory; a trailing `/` is appended when missing
    pub fn add_directory(&mut self, directory: impl Into<String>) {
        let mut directory = directory.into();
        if !directory.is_empty() && !directory.ends_with('/') {
            directory.push('/');
        }
        if !self.directories.contains(&directory) {
            self.directories.push(directory);
        }
    }

    pub fn directories(&self) -> &[String] {
        &self.directories
    }

    pub fn global_header(&self) -> &str {
        &self.global_header
    }

    /// Replace the text prepended to generated stages
    pub fn set_global_header(&mut self, header: impl Into<String>) {
        self.global_header = header.into();
        self.clear_caches();
    }

    pub fn add_global_header_file(&mut self, filename: impl Into<String>) {
        self.global_header_files.push(filename.into());
    }

    pub fn add_global_define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.global_defines.insert(name.into(), value.into());
    }

    pub fn add_global_define_int(&mut self, name: impl Into<String>, value: i32) {
        self.add_global_define(name, value.to_string());
    }

    pub fn add_global_define_float(&mut self, name: impl Into<String>, value: f32) {
        self.add_global_define(name, format!("{:.11}", value));
    }

    pub fn global_defines_string(&self) -> String {
        render_defines(&self.global_defines)
    }

    pub fn set_force_highp(&mut self, enabled: bool) {
        self.force_highp = enabled;
    }

    pub fn set_treat_warnings_as_errors(&mut self, enabled: bool) {
        if self.treat_warnings_as_errors != enabled {
            self.treat_warnings_as_errors = enabled;
            self.clear_caches();
        }
    }

    /// Drop global header files and global defines
    pub fn clear_globals(&mut self) {
        self.global_header_files.clear();
        self.global_defines.clear();
    }

    pub fn clear_caches(&self) {
        self.shader_cache.clear();
        self.pipeline_cache.clear();
    }

    pub fn shader_cache_stats(&self) -> CacheStats {
        self.shader_cache.stats()
    }

    pub fn pipeline_cache_stats(&self) -> CacheStats {
        self.pipeline_cache.stats()
    }

    /// Register a descriptor and return its code; an equal descriptor keeps its code
    pub fn add_descriptor(&self, descriptor: ShaderDescriptor) -> u32 {
        let mut registry = self.registry.write();
        if let Some((code, _)) = registry
            .descriptors
            .iter()
            .find(|(_, existing)| **existing == descriptor)
        {
            return *code;
        }
        let code = registry.next_code;
        registry.next_code += 1;
        debug!("registered shader {} as code {}", descriptor.name(), code);
        registry.descriptors.insert(code, descriptor);
        code
    }

    pub fn get_descriptor(&self, code: u32) -> Option<ShaderDescriptor> {
        self.registry.read().descriptors.get(&code).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<u32> {
        self.registry
            .read()
            .descriptors
            .iter()
            .find(|(_, descriptor)| descriptor.name() == name)
            .map(|(code, _)| *code)
    }

    /// Descriptors with a non-empty name, by code
    pub fn named_descriptors(&self) -> Vec<(u32, ShaderDescriptor)> {
        self.registry
            .read()
            .descriptors
            .iter()
            .filter(|(_, descriptor)| !descriptor.name().is_empty())
            .map(|(code, descriptor)| (*code, descriptor.clone()))
            .collect()
    }

    pub fn codes(&self) -> Vec<u32> {
        self.registry.read().descriptors.keys().copied().collect()
    }

    /// JSON list of the named descriptors
    pub fn export_descriptors(&self) -> Result<String, FactoryError> {
        let descriptors: Vec<ShaderDescriptor> = self
            .named_descriptors()
            .into_iter()
            .map(|(_, descriptor)| descriptor)
            .collect();
        Ok(serde_json::to_string_pretty(&descriptors)?)
    }

    /// Register every descriptor of a JSON list, returning their codes
    pub fn import_descriptors(&self, json: &str) -> Result<Vec<u32>, FactoryError> {
        let descriptors: Vec<ShaderDescriptor> = serde_json::from_str(json)?;
        Ok(descriptors
            .into_iter()
            .map(|descriptor| self.add_descriptor(descriptor))
            .collect())
    }

    pub fn save_descriptors(&self, path: impl AsRef<Path>) -> Result<(), FactoryError> {
        let path = path.as_ref();
        let json = self.export_descriptors()?;
        std::fs::write(path, json).map_err(|source| FactoryError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn load_descriptors(&self, path: impl AsRef<Path>) -> Result<Vec<u32>, FactoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| FactoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.import_descriptors(&json)
    }

    /// Read `filename` from the first directory that has it
    fn read_file(&self, filename: &str) -> Result<(String, String), FactoryError> {
        let candidates: Vec<String> = if self.directories.is_empty() {
            vec![filename.to_string()]
        } else {
            self.directories
                .iter()
                .map(|directory| format!("{}{}", directory, filename))
                .collect()
        };
        for path in &candidates {
            if !Path::new(path).is_file() {
                continue;
            }
            return match std::fs::read_to_string(path) {
                Ok(content) => Ok((path.clone(), content)),
                Err(source) => Err(FactoryError::Io {
                    path: path.clone(),
                    source,
                }),
            };
        }
        warn!("unable to load shader file {}", filename);
        Err(FactoryError::FileNotFound {
            path: filename.to_string(),
            searched: self.directories.clone(),
        })
    }

    fn prologue(&self, descriptor: &ShaderDescriptor, stage: ShaderStage) -> Result<String, FactoryError> {
        let mut text = String::new();
        if self.force_highp {
            text.push_str("force_highp;\n");
        }
        text.push_str(&self.global_defines_string());
        text.push_str(&format!("#define TYPE_{} 1\n", stage.type_define()));
        if stage == ShaderStage::Compute {
            let size = descriptor.workgroup_size();
            if !size.is_valid() {
                return Err(FactoryError::InvalidWorkgroupSize {
                    shader: descriptor.name().to_string(),
                    size,
                });
            }
            text.push_str(&format!("#define WORKGROUP_SIZE_X {}u\n", size.x));
            text.push_str(&format!("#define WORKGROUP_SIZE_Y {}u\n", size.y));
            text.push_str(&format!("#define WORKGROUP_SIZE_Z {}u\n", size.z));
        }
        text.push_str(&descriptor.defines_string());
        Ok(text)
    }

    /// Build the full source of one stage of `descriptor`
    pub fn assemble_stage(
        &self,
        descriptor: &ShaderDescriptor,
        stage: ShaderStage,
    ) -> Result<AssembledStage, FactoryError> {
        let mut files = SourceMap::new();
        let mut source = AssembledSource::new();
        source.append_text(&mut files, DEFINES_NAME, &self.prologue(descriptor, stage)?);

        let global_headers: &[String] = if stage.is_tessellation() {
            &[]
        } else {
            &self.global_header_files
        };
        let mut loaded = Vec::new();
        for filename in global_headers
            .iter()
            .chain(descriptor.header_files())
            .map(String::as_str)
            .chain(std::iter::once(descriptor.filename(stage)))
        {
            let (path, content) = self.read_file(filename)?;
            source.append_file(&mut files, &path, &content);
            loaded.push(path);
        }
        info!("assembled {} stage from {}", stage, loaded.join(", "));

        Ok(AssembledStage { stage, source, files })
    }

    /// Tessellation stages keep their source; only the header goes in front
    fn passthrough(&self, assembled: &AssembledStage) -> StageOutput {
        let header = &self.global_header;
        let mut text = String::new();
        if header.starts_with("#version") {
            let split = header.find('\n').map_or(header.len(), |end| end + 1);
            text.push_str(&header[..split]);
            if self.target.is_gles() {
                text.push_str(GLES_TESSELLATION_EXTENSIONS);
            }
            text.push_str(&header[split..]);
        } else {
            if self.target.is_gles() {
                text.push_str(GLES_TESSELLATION_EXTENSIONS);
            }
            text.push_str(header);
        }
        text.push_str(assembled.text());

        StageOutput {
            stage: assembled.stage,
            source: text,
            entry_point: self.target.entry_point(assembled.stage).to_string(),
            version: self.target.version(assembled.stage).map(str::to_string),
            reflection: None,
            diagnostics: Default::default(),
        }
    }

    fn compile_assembled(
        &self,
        descriptor: &ShaderDescriptor,
        assembled: &AssembledStage,
    ) -> Result<StageOutput, FactoryError> {
        let stage = assembled.stage;
        if stage.is_tessellation() {
            return Ok(self.passthrough(assembled));
        }

        let workgroup = (stage == ShaderStage::Compute).then(|| descriptor.workgroup_size());
        let ctx = CompileContext::new(self.target, stage, workgroup)
            .map_err(|_| FactoryError::InvalidWorkgroupSize {
                shader: descriptor.name().to_string(),
                size: descriptor.workgroup_size(),
            })?
            .with_warnings_as_errors(self.treat_warnings_as_errors);

        let remap = |span: &diagnostics::SourceSpan| assembled.source.resolve_span(span);
        match compile_stage(assembled.text(), &ctx) {
            Ok(mut output) => {
                output.diagnostics.remap_spans(remap);
                output.source = format!("{}{}", self.global_header, output.source);
                Ok(output)
            }
            Err(mut diagnostics) => {
                diagnostics.remap_spans(remap);
                error!(
                    "{} stage of shader '{}' failed to compile",
                    stage,
                    descriptor.name()
                );
                Err(FactoryError::Compile {
                    stage,
                    diagnostics,
                    sources: assembled.files.clone(),
                })
            }
        }
    }

    fn assemble_all(&self, descriptor: &ShaderDescriptor) -> Result<Vec<AssembledStage>, FactoryError> {
        descriptor
            .stages()
            .map(|stage| self.assemble_stage(descriptor, stage))
            .collect()
    }

    /// Translate every stage of the registered descriptor `code`
    pub fn create(&self, code: u32) -> Result<CompiledShaderSet, FactoryError> {
        let descriptor = self
            .get_descriptor(code)
            .ok_or(FactoryError::UnknownShader(code))?;
        let assembled = self.assemble_all(&descriptor)?;

        let bindings = if descriptor.uniforms().is_empty() {
            common_uniforms()
        } else {
            descriptor.uniforms().to_vec()
        };

        if self.target.is_vulkan() {
            let mut sources: [String; 6] = Default::default();
            for stage in &assembled {
                sources[stage.stage.index()] = stage.text().to_string();
            }
            let key = PipelineKey { code, sources };
            let set = self.pipeline_cache.get_or_compile(key, || {
                let stages = assembled
                    .iter()
                    .map(|stage| self.compile_assembled(&descriptor, stage))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, FactoryError>(CompiledShaderSet {
                    code,
                    name: descriptor.name().to_string(),
                    stages,
                    bindings: bindings.clone(),
                })
            })?;
            return Ok(Arc::unwrap_or_clone(set));
        }

        // stages are only inserted once the whole descriptor compiled
        let mut stages = Vec::with_capacity(assembled.len());
        let mut compiled = Vec::new();
        for stage in &assembled {
            let key = stage.text().to_string();
            match self.shader_cache.search(&key) {
                Some(output) => {
                    debug!("{} stage of shader {} found in the shader cache", stage.stage, code);
                    stages.push(StageOutput::clone(&output));
                }
                None => {
                    let output = self.compile_assembled(&descriptor, stage)?;
                    compiled.push((key, output.clone()));
                    stages.push(output);
                }
            }
        }
        for (key, output) in compiled {
            self.shader_cache.insert(key, output);
        }
        Ok(CompiledShaderSet {
            code,
            name: descriptor.name().to_string(),
            stages,
            bindings,
        })
    }

    /// Compile every registered descriptor in parallel to warm the caches
    pub fn precompile_all(&self) -> Vec<(u32, Result<(), FactoryError>)> {
        let codes = self.codes();
        info!("precompiling {} shader(s)", codes.len());
        codes
            .into_par_iter()
            .map(|code| (code, self.create(code).map(|_| ())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kslc_factory_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    const VERTEX: &str = "in vec4 position;\nuniform mat4 mvp;\nvoid main()\n{\n\tgl_Position = mvp * position;\n}";
    const FRAGMENT: &str = "uniform vec4 tint;\nvoid main()\n{\n\tgl_FragData[0] = tint;\n}";

    #[test]
    fn test_assembly_order() {
        let dir = scratch_dir("order");
        write(&dir, "global.h", "// global");
        write(&dir, "local.h", "// local");
        write(&dir, "blit.vs", "void main() {}");

        let mut factory = ShaderFactory::new(Target::OpenGl);
        factory.add_directory(dir.display().to_string());
        factory.add_global_header_file("global.h");
        factory.add_global_define_int("QUALITY", 3);
        factory.set_force_highp(true);

        let descriptor = ShaderDescriptor::new()
            .set_vs("blit.vs")
            .add_header_file("local.h")
            .add_define("BLUR");
        let assembled = factory.assemble_stage(&descriptor, ShaderStage::Vertex).unwrap();
        assert_eq!(
            assembled.text(),
            "force_highp;\n#define QUALITY 3\n#define TYPE_vertex 1\n#define BLUR 1\n// global\n// local\nvoid main() {}\n"
        );
    }

    #[test]
    fn test_compute_workgroup_defines() {
        let dir = scratch_dir("workgroup");
        write(&dir, "reduce.cs", "void main() {}");
        let mut factory = ShaderFactory::new(Target::Vulkan);
        factory.add_directory(dir.display().to_string());

        let descriptor = ShaderDescriptor::compute("reduce.cs").set_workgroup_size(8, 4, 1);
        let assembled = factory.assemble_stage(&descriptor, ShaderStage::Compute).unwrap();
        assert!(assembled.text().starts_with(
            "#define TYPE_compute 1\n#define WORKGROUP_SIZE_X 8u\n#define WORKGROUP_SIZE_Y 4u\n#define WORKGROUP_SIZE_Z 1u\n"
        ));

        let code = factory.add_descriptor(ShaderDescriptor::compute("reduce.cs").set_name("bad"));
        assert!(matches!(
            factory.create(code),
            Err(FactoryError::InvalidWorkgroupSize { .. })
        ));
    }

    #[test]
    fn test_missing_file_lists_directories() {
        let dir = scratch_dir("missing");
        let mut factory = ShaderFactory::new(Target::OpenGl);
        factory.add_directory(dir.display().to_string());
        let code = factory.add_descriptor(ShaderDescriptor::vertex_fragment("nope.vs", "nope.fs"));

        match factory.create(code) {
            Err(FactoryError::FileNotFound { path, searched }) => {
                assert_eq!(path, "nope.vs");
                assert_eq!(searched.len(), 1);
                assert!(searched[0].ends_with('/'));
            }
            other => panic!("expected FileNotFound, got {:?}", other.map(|set| set.code)),
        }
    }

    #[test]
    fn test_create_and_cache() {
        let dir = scratch_dir("create");
        write(&dir, "mesh.vs", VERTEX);
        write(&dir, "mesh.fs", FRAGMENT);
        let mut factory = ShaderFactory::new(Target::OpenGl);
        factory.add_directory(dir.display().to_string());

        let code = factory.add_descriptor(ShaderDescriptor::vertex_fragment("mesh.vs", "mesh.fs").set_name("mesh"));
        let set = factory.create(code).unwrap();
        assert_eq!(set.stages.len(), 2);
        assert_eq!(set.name, "mesh");
        let vertex = set.stage(ShaderStage::Vertex).unwrap();
        assert!(vertex.source.starts_with("#version 430 core\n"));
        assert!(vertex.reflection.is_some());
        assert!(set.bindings.iter().any(|binding| binding.name == "mvp"));

        factory.create(code).unwrap();
        let stats = factory.shader_cache_stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_vulkan_uses_pipeline_cache() {
        let dir = scratch_dir("vulkan");
        write(&dir, "mesh.vs", VERTEX);
        write(&dir, "mesh.fs", FRAGMENT);
        let mut factory = ShaderFactory::new(Target::Vulkan);
        factory.add_directory(dir.display().to_string());

        let code = factory.add_descriptor(ShaderDescriptor::vertex_fragment("mesh.vs", "mesh.fs"));
        factory.create(code).unwrap();
        factory.create(code).unwrap();
        assert_eq!(factory.pipeline_cache_stats().entries, 1);
        assert_eq!(factory.pipeline_cache_stats().hits, 1);
        assert!(factory.shader_cache_stats().entries == 0);
    }

    #[test]
    fn test_failure_points_at_stage_file() {
        let dir = scratch_dir("failure");
        write(&dir, "mesh.vs", VERTEX);
        write(&dir, "broken.fs", "void main()\n{\n\tfloat x = 1.0 $ 2.0;\n}");
        let mut factory = ShaderFactory::new(Target::OpenGl);
        factory.add_directory(dir.display().to_string());
        factory.add_global_define_int("QUALITY", 1);

        let code = factory.add_descriptor(ShaderDescriptor::vertex_fragment("mesh.vs", "broken.fs"));
        match factory.create(code) {
            Err(FactoryError::Compile {
                stage,
                diagnostics,
                sources,
            }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                let first = diagnostics.iter().next().unwrap();
                assert_eq!(first.span.start.line, 3);
                assert!(sources
                    .file_name(first.span.file_id)
                    .unwrap()
                    .ends_with("broken.fs"));
            }
            other => panic!("expected a compile failure, got {:?}", other.map(|set| set.code)),
        }
        assert_eq!(factory.shader_cache_stats().entries, 0);
    }

    #[test]
    fn test_gles_tessellation_passthrough() {
        let dir = scratch_dir("tess");
        write(&dir, "patch.tcs", "layout(vertices = 3) out;");
        let mut factory = ShaderFactory::new(Target::OpenGlEs);
        factory.add_directory(dir.display().to_string());

        let code = factory.add_descriptor(ShaderDescriptor::new().set_tcs("patch.tcs"));
        let set = factory.create(code).unwrap();
        let output = set.stage(ShaderStage::TessControl).unwrap();
        assert!(output.source.starts_with(
            "#version 310 es\n#extension GL_EXT_tessellation_shader : enable\n#extension GL_OES_tessellation_shader : enable\nprecision highp float;\n"
        ));
        assert!(output.source.ends_with("#define TYPE_tessellation_control 1\nlayout(vertices = 3) out;\n"));
    }

    #[test]
    fn test_equal_descriptors_share_a_code() {
        let factory = ShaderFactory::new(Target::OpenGl);
        let first = factory.add_descriptor(ShaderDescriptor::vertex_fragment("a.vs", "a.fs").set_name("a"));
        let again = factory.add_descriptor(ShaderDescriptor::vertex_fragment("a.vs", "a.fs").set_name("other"));
        let different = factory.add_descriptor(ShaderDescriptor::vertex_fragment("a.vs", "a.fs").add_define("X"));
        assert_eq!(first, again);
        assert_ne!(first, different);
        assert_eq!(factory.find_by_name("a"), Some(first));
        assert!(matches!(factory.create(99), Err(FactoryError::UnknownShader(99))));
    }

    #[test]
    fn test_descriptor_export_skips_unnamed() {
        let source = ShaderDescriptor::vertex_fragment("a.vs", "a.fs").set_name("kept");
        let factory = ShaderFactory::new(Target::OpenGl);
        factory.add_descriptor(source.clone());
        factory.add_descriptor(ShaderDescriptor::compute("c.cs").set_workgroup_size(1, 1, 1));

        let json = factory.export_descriptors().unwrap();
        let other = ShaderFactory::new(Target::MetalMacos);
        let codes = other.import_descriptors(&json).unwrap();
        assert_eq!(codes.len(), 1);
        assert_eq!(other.get_descriptor(codes[0]).unwrap(), source);
    }

    #[test]
    fn test_directory_normalisation() {
        let mut factory = ShaderFactory::new(Target::OpenGl);
        factory.add_directory("shaders");
        factory.add_directory("shaders/");
        assert_eq!(factory.directories(), ["shaders/".to_string()]);
    }
}
