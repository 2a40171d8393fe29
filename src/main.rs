//! kslc - shading dialect translator
//!
//! # Usage
//!
//! ```bash
//! # Translate one stage file
//! kslc translate blur.fs --target d3d11 --stage fragment
//!
//! # Compute stages need a workgroup size
//! kslc translate reduce.cs --target metal_macos --stage compute --workgroup 64,1,1
//!
//! # Register and precompile every descriptor of a set
//! kslc build --config factory.toml --descriptors shaders.json
//!
//! # Explain a diagnostic code
//! kslc explain E0003
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use compiler::error_codes::{error_registry, get_error_code, parse_error_code};
use compiler::{compile_stage, logging, CompileContext, FactoryConfig, ShaderFactory, Target, WorkgroupSize};
use diagnostics::{ErrorFormatter, ShaderStage, SourceMap};

#[derive(Parser)]
#[command(name = "kslc")]
#[command(version = "0.1.0")]
#[command(about = "Translate shading dialect sources to GLSL, HLSL and Metal", long_about = None)]
struct Cli {
    /// Log verbosity; RUST_LOG is used when absent
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a single stage source
    Translate {
        /// Path to the stage source
        file: PathBuf,

        /// opengl, opengles, vulkan, d3d11, d3d12, metal_macos or metal_ios
        #[arg(short, long, default_value = "opengl")]
        target: String,

        /// vertex, fragment, compute, geometry (or vs, fs, cs, gs)
        #[arg(short, long, default_value = "fragment")]
        stage: String,

        /// Compute workgroup size as x,y,z
        #[arg(long)]
        workgroup: Option<String>,

        /// Define NAME or NAME=VALUE before the first line
        #[arg(short = 'D', value_name = "NAME[=VALUE]")]
        defines: Vec<String>,

        /// Print the reflection record as JSON after the source
        #[arg(long)]
        reflection: bool,

        /// Treat warnings as errors
        #[arg(long)]
        werror: bool,
    },

    /// Register a descriptor set and precompile every descriptor
    Build {
        /// Factory configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Descriptor list (JSON)
        #[arg(short, long)]
        descriptors: PathBuf,
    },

    /// Show the explanation of a diagnostic code, or list them all
    Explain {
        code: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });

    let result = match cli.command {
        Commands::Translate { file, target, stage, workgroup, defines, reflection, werror } => {
            translate(file, &target, &stage, workgroup.as_deref(), defines, reflection, werror)
        }
        Commands::Build { config, descriptors } => build(config, descriptors),
        Commands::Explain { code } => explain(code.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn parse_workgroup(text: &str) -> Result<WorkgroupSize, String> {
    let axes = text
        .split(',')
        .map(|axis| axis.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Invalid workgroup size '{}': {}", text, e))?;
    match axes.as_slice() {
        [x, y, z] => Ok(WorkgroupSize::new(*x, *y, *z)),
        [x, y] => Ok(WorkgroupSize::new(*x, *y, 1)),
        [x] => Ok(WorkgroupSize::new(*x, 1, 1)),
        _ => Err(format!("Invalid workgroup size '{}': expected x,y,z", text)),
    }
}

fn translate(
    file: PathBuf,
    target: &str,
    stage: &str,
    workgroup: Option<&str>,
    defines: Vec<String>,
    reflection: bool,
    werror: bool,
) -> Result<(), String> {
    let target: Target = target.parse()?;
    let stage: ShaderStage = stage.parse()?;
    let workgroup = workgroup.map(parse_workgroup).transpose()?;

    if !file.exists() {
        return Err(format!("File not found: {}", file.display()));
    }
    let source = std::fs::read_to_string(&file)
        .map_err(|e| format!("Failed to read file: {}", e))?;

    let mut sources = SourceMap::new();
    let file_id = sources.add_file(file.display().to_string(), source.clone());

    let mut ctx = CompileContext::new(target, stage, workgroup)
        .map_err(|e| e.to_string())?
        .with_warnings_as_errors(werror)
        .with_file_id(file_id);
    for define in defines {
        ctx = match define.split_once('=') {
            Some((name, value)) => ctx.with_define(name, value),
            None => ctx.with_define(define, "1"),
        };
    }

    let formatter = ErrorFormatter::new();
    match compile_stage(&source, &ctx) {
        Ok(output) => {
            if !output.diagnostics.is_empty() {
                eprint!("{}", formatter.format_diagnostics(&output.diagnostics, &sources));
            }
            print!("{}", output.source);
            if reflection {
                if let Some(record) = &output.reflection {
                    let json = serde_json::to_string_pretty(record)
                        .map_err(|e| format!("Failed to serialize reflection: {}", e))?;
                    println!("{}", json);
                }
            }
            Ok(())
        }
        Err(diagnostics) => {
            eprint!("{}", formatter.format_diagnostics(&diagnostics, &sources));
            Err(format!("{} stage of {} failed to translate", stage, file.display()))
        }
    }
}

fn build(config: Option<PathBuf>, descriptors: PathBuf) -> Result<(), String> {
    let config = match config {
        Some(path) => FactoryConfig::load(&path).map_err(|e| e.to_string())?,
        None => FactoryConfig::default(),
    };
    let factory = ShaderFactory::from_config(&config);
    let codes = factory
        .load_descriptors(&descriptors)
        .map_err(|e| e.to_string())?;
    println!("Registered {} shader(s) for {}", codes.len(), factory.target());

    let formatter = ErrorFormatter::new();
    let mut failures = 0;
    for (code, result) in factory.precompile_all() {
        let name = factory
            .get_descriptor(code)
            .map(|descriptor| descriptor.name().to_string())
            .unwrap_or_default();
        match result {
            Ok(()) => println!("  ✓ {} ({})", name, code),
            Err(e) => {
                failures += 1;
                println!("  ✗ {} ({})", name, code);
                eprintln!("{}", e.render(&formatter));
            }
        }
    }

    let stats = factory.shader_cache_stats();
    log::info!("shader cache: {} entries, {:.0}% hits", stats.entries, stats.hit_rate() * 100.0);
    if failures > 0 {
        return Err(format!("{} of {} shader(s) failed", failures, codes.len()));
    }
    Ok(())
}

fn explain(code: Option<&str>) -> Result<(), String> {
    let Some(code) = code else {
        for entry in error_registry().all() {
            println!("{}", entry);
        }
        return Ok(());
    };
    let entry = parse_error_code(code)
        .and_then(get_error_code)
        .ok_or_else(|| format!("Unknown error code: {}", code))?;
    println!("{}", entry);
    if let Some(help) = entry.help {
        println!("  help: {}", help);
    }
    Ok(())
}
