//! Error types of the translator and the shader factory

use std::fmt;

use diagnostics::shader::ShaderDiagnostics;
use diagnostics::{Diagnostics, ErrorFormatter, ShaderStage, SourceMap, SourceSpan};

use crate::context::WorkgroupSize;

/// Failure of a single stage translation
#[derive(Debug, Clone)]
pub enum CompileError {
    UnsupportedStage {
        stage: ShaderStage,
        backend: &'static str,
    },
    UnsupportedType {
        name: String,
        ty: String,
        context: &'static str,
        span: SourceSpan,
    },
    InvalidWorkgroupSize(WorkgroupSize),
    /// Warnings were promoted under `treat_warnings_as_errors`
    WarningsAsErrors(usize),
    Diagnostics(Diagnostics),
}

impl CompileError {
    /// Diagnostic list describing the failure, for callers that only show diagnostics
    pub fn into_diagnostics(self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        match self {
            CompileError::Diagnostics(list) => return list,
            CompileError::UnsupportedStage { stage, backend } => {
                diagnostics.push(ShaderDiagnostics::unsupported_stage(stage, backend));
            }
            CompileError::UnsupportedType { name, ty, context, span } => {
                let what = format!("{} '{}'", context, name);
                diagnostics.push(ShaderDiagnostics::unsupported_type(span, &ty, &what));
            }
            CompileError::WarningsAsErrors(count) => {
                diagnostics.push(ShaderDiagnostics::warnings_as_errors(count));
            }
            other => {
                diagnostics.push(
                    diagnostics::DiagnosticBuilder::error(other.to_string(), SourceSpan::dummy())
                        .build(),
                );
            }
        }
        diagnostics
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnsupportedStage { stage, backend } => {
                write!(f, "{} stage is not supported by the {} backend", stage, backend)
            }
            CompileError::UnsupportedType { name, ty, context, .. } => {
                write!(f, "unsupported type '{}' for {} '{}'", ty, context, name)
            }
            CompileError::InvalidWorkgroupSize(size) => {
                write!(f, "compute stage needs a non-zero workgroup size, got {}", size)
            }
            CompileError::WarningsAsErrors(count) => {
                write!(f, "{} warning(s) treated as errors", count)
            }
            CompileError::Diagnostics(list) => write!(f, "{}", list),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<Diagnostics> for CompileError {
    fn from(diagnostics: Diagnostics) -> Self {
        CompileError::Diagnostics(diagnostics)
    }
}

/// Failure of a descriptor-level operation
#[derive(Debug)]
pub enum FactoryError {
    UnknownShader(u32),
    FileNotFound {
        path: String,
        searched: Vec<String>,
    },
    Io {
        path: String,
        source: std::io::Error,
    },
    InvalidWorkgroupSize {
        shader: String,
        size: WorkgroupSize,
    },
    /// A stage failed; the whole descriptor yields nothing
    Compile {
        stage: ShaderStage,
        diagnostics: Diagnostics,
        /// Files the failing stage was assembled from
        sources: SourceMap,
    },
    Serialization(String),
    Config(String),
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryError::UnknownShader(code) => write!(f, "unknown shader code {}", code),
            FactoryError::FileNotFound { path, searched } => {
                if searched.is_empty() {
                    write!(f, "file not found: {}", path)
                } else {
                    write!(f, "file not found: {} (searched {})", path, searched.join(", "))
                }
            }
            FactoryError::Io { path, source } => write!(f, "failed to read {}: {}", path, source),
            FactoryError::InvalidWorkgroupSize { shader, size } => {
                write!(f, "shader '{}' has an invalid compute workgroup size {}", shader, size)
            }
            FactoryError::Compile { stage, diagnostics, .. } => {
                write!(f, "{} stage failed to compile:\n{}", stage, diagnostics)
            }
            FactoryError::Serialization(message) => write!(f, "serialization error: {}", message),
            FactoryError::Config(message) => write!(f, "configuration error: {}", message),
        }
    }
}

impl FactoryError {
    /// Display form with source excerpts for compile failures
    pub fn render(&self, formatter: &ErrorFormatter) -> String {
        match self {
            FactoryError::Compile {
                stage,
                diagnostics,
                sources,
            } => format!(
                "{} stage failed to compile:\n{}",
                stage,
                formatter.format_diagnostics(diagnostics, sources)
            ),
            other => other.to_string(),
        }
    }
}

impl std::error::Error for FactoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FactoryError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FactoryError {
    fn from(error: serde_json::Error) -> Self {
        FactoryError::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for FactoryError {
    fn from(error: toml::de::Error) -> Self {
        FactoryError::Config(error.to_string())
    }
}
