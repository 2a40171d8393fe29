//! Factory behaviour across descriptors, threads and persisted files

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use compiler::{logging, FactoryConfig, FactoryError, ShaderDescriptor, ShaderFactory, Target, UniformGroup};
use diagnostics::ShaderStage;

const VERTEX: &str = "in vec4 position;\nuniform mat4 mvp;\nvoid main()\n{\n\tgl_Position = mvp * position;\n}";
const FRAGMENT: &str = "uniform vec4 tint;\nvoid main()\n{\n#ifdef FADE\n\tgl_FragData[0] = tint * 0.5;\n#else\n\tgl_FragData[0] = tint;\n#endif\n}";

fn shader_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("kslc_cache_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("mesh.vs"), VERTEX).unwrap();
    fs::write(dir.join("mesh.fs"), FRAGMENT).unwrap();
    dir
}

fn factory(target: Target, dir: &Path) -> ShaderFactory {
    let mut factory = ShaderFactory::new(target);
    factory.add_directory(dir.display().to_string());
    factory
}

#[test]
fn test_define_order_hits_and_value_change_misses() {
    logging::init_test();
    let dir = shader_dir("identity");
    let factory = factory(Target::OpenGl, &dir);

    let first = ShaderDescriptor::vertex_fragment("mesh.vs", "mesh.fs")
        .add_define_int("QUALITY", 2)
        .add_define("FADE");
    // the uniform list keeps the descriptors apart while their sources match
    let reordered = ShaderDescriptor::vertex_fragment("mesh.vs", "mesh.fs")
        .add_define("FADE")
        .add_define_int("QUALITY", 2)
        .add_uniform("tint", UniformGroup::Manual);
    let changed = ShaderDescriptor::vertex_fragment("mesh.vs", "mesh.fs")
        .add_define_int("QUALITY", 3)
        .add_define("FADE");

    let first = factory.add_descriptor(first);
    let reordered = factory.add_descriptor(reordered);
    assert_ne!(first, reordered);

    factory.create(first).unwrap();
    factory.create(reordered).unwrap();
    let stats = factory.shader_cache_stats();
    assert_eq!((stats.entries, stats.hits, stats.misses), (2, 2, 2));

    let changed = factory.add_descriptor(changed);
    factory.create(changed).unwrap();
    let stats = factory.shader_cache_stats();
    assert_eq!((stats.entries, stats.hits, stats.misses), (4, 2, 4));
}

#[test]
fn test_defines_select_code() {
    logging::init_test();
    let dir = shader_dir("select");
    let factory = factory(Target::OpenGl, &dir);
    let faded = factory.add_descriptor(ShaderDescriptor::vertex_fragment("mesh.vs", "mesh.fs").add_define("FADE"));
    let solid = factory.add_descriptor(ShaderDescriptor::vertex_fragment("mesh.vs", "mesh.fs"));

    let faded = factory.create(faded).unwrap();
    let solid = factory.create(solid).unwrap();
    let faded = &faded.stage(ShaderStage::Fragment).unwrap().source;
    let solid = &solid.stage(ShaderStage::Fragment).unwrap().source;
    assert!(faded.contains("0.5"), "{}", faded);
    assert!(!solid.contains("0.5"), "{}", solid);
}

#[test]
fn test_concurrent_creates_agree() {
    logging::init_test();
    let dir = shader_dir("threads");
    let factory = Arc::new(factory(Target::Direct3D11, &dir));
    let code = factory.add_descriptor(ShaderDescriptor::vertex_fragment("mesh.vs", "mesh.fs"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let factory = Arc::clone(&factory);
            thread::spawn(move || factory.create(code).unwrap())
        })
        .collect();
    let sets: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for set in &sets[1..] {
        for (a, b) in set.stages.iter().zip(&sets[0].stages) {
            assert_eq!(a.source, b.source);
        }
    }
    assert_eq!(factory.shader_cache_stats().entries, 2);
}

#[test]
fn test_parallel_precompile_reports_each_descriptor() {
    logging::init_test();
    let dir = shader_dir("precompile");
    let factory = factory(Target::MetalMacos, &dir);
    let good = factory.add_descriptor(ShaderDescriptor::vertex_fragment("mesh.vs", "mesh.fs").set_name("good"));
    let missing = factory.add_descriptor(ShaderDescriptor::vertex_fragment("mesh.vs", "gone.fs").set_name("missing"));

    let results = factory.precompile_all();
    assert_eq!(results.len(), 2);
    for (code, result) in results {
        if code == good {
            assert!(result.is_ok());
        } else {
            assert_eq!(code, missing);
            assert!(matches!(result, Err(FactoryError::FileNotFound { .. })));
        }
    }
}

#[test]
fn test_config_and_descriptor_files() {
    logging::init_test();
    let dir = shader_dir("files");
    let config = format!(
        "target = \"vulkan\"\ndirectories = [\"{}\"]\ntreat-warnings-as-errors = true\n\n[global-int-defines]\nLIGHTS = 4\n",
        dir.display()
    );
    let config = FactoryConfig::parse(&config).unwrap();
    let factory = ShaderFactory::from_config(&config);
    assert_eq!(factory.target(), Target::Vulkan);
    assert_eq!(factory.global_defines_string(), "#define LIGHTS 4\n");

    let json = r#"[{"name": "mesh", "shader_vs": "mesh.vs", "shader_fs": "mesh.fs", "defines": {"FADE": "1"}}]"#;
    let path = dir.join("shaders.json");
    fs::write(&path, json).unwrap();
    let codes = factory.load_descriptors(&path).unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(factory.find_by_name("mesh"), Some(codes[0]));

    let set = factory.create(codes[0]).unwrap();
    let vertex = set.stage(ShaderStage::Vertex).unwrap();
    assert!(vertex.source.starts_with("#version 450\n"), "{}", vertex.source);
    assert!(set.stage(ShaderStage::Fragment).unwrap().reflection.is_some());
    assert_eq!(factory.pipeline_cache_stats().entries, 1);

    let saved = dir.join("saved.json");
    factory.save_descriptors(&saved).unwrap();
    let reloaded = ShaderFactory::new(Target::OpenGl);
    let again = reloaded.load_descriptors(&saved).unwrap();
    assert_eq!(reloaded.get_descriptor(again[0]), factory.get_descriptor(codes[0]));
}
