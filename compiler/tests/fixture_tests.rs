//! Every fixture shader translates for every target

use std::path::{Path, PathBuf};

use compiler::{compile_stage, logging, CompileContext, Target, WorkgroupSize};
use diagnostics::ShaderStage;
use walkdir::WalkDir;

fn fixtures() -> Vec<PathBuf> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| stage_of(path).is_some())
        .collect();
    files.sort();
    files
}

fn stage_of(path: &Path) -> Option<ShaderStage> {
    path.extension()?.to_str()?.parse().ok()
}

#[test]
fn test_fixtures_translate_for_every_target() {
    logging::init_test();
    let files = fixtures();
    assert!(files.len() >= 3, "fixtures missing: {:?}", files);

    for path in &files {
        let source = std::fs::read_to_string(path).unwrap();
        let stage = stage_of(path).unwrap();
        let workgroup = (stage == ShaderStage::Compute).then(|| WorkgroupSize::new(64, 1, 1));
        for target in Target::ALL {
            let ctx = CompileContext::new(target, stage, workgroup).unwrap();
            let output = compile_stage(&source, &ctx)
                .unwrap_or_else(|d| panic!("{} on {}: {}", path.display(), target, d));
            assert!(!output.source.is_empty());
            assert_eq!(output.entry_point, target.entry_point(stage));
        }
    }
}

#[test]
fn test_fixture_defines_reach_the_preprocessor() {
    logging::init_test();
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/grade.fs");
    let source = std::fs::read_to_string(path).unwrap();

    let plain = CompileContext::new(Target::OpenGl, ShaderStage::Fragment, None).unwrap();
    let tinted = plain.clone().with_define("USE_TINT", "1");
    let plain = compile_stage(&source, &plain).unwrap().source;
    let tinted = compile_stage(&source, &tinted).unwrap().source;
    assert!(!plain.contains("color * tint"), "{}", plain);
    assert!(tinted.contains("color * tint"), "{}", tinted);
}

#[test]
fn test_mesh_reflection_lists_attributes() {
    logging::init_test();
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mesh.vs");
    let source = std::fs::read_to_string(path).unwrap();
    let ctx = CompileContext::new(Target::Direct3D11, ShaderStage::Vertex, None).unwrap();
    let reflection = compile_stage(&source, &ctx).unwrap().reflection.unwrap();

    let names: Vec<&str> = reflection.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["in_position", "in_normal", "in_texcoord0"]);
    assert!(reflection.resource("mvp").is_some());
}
