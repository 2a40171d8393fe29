//! TOML configuration for the shader factory.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::Target;
use crate::error::FactoryError;

/// Factory settings, usually loaded from `factory.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FactoryConfig {
    pub target: Target,
    /// Directories searched, in order, for stage and header files
    pub directories: Vec<String>,
    /// Text put in front of every generated stage; the target's default when absent
    pub global_header: Option<String>,
    /// Headers included by every non-tessellation stage
    pub global_header_files: Vec<String>,
    pub global_int_defines: BTreeMap<String, i32>,
    pub global_float_defines: BTreeMap<String, f32>,
    pub force_highp: bool,
    pub treat_warnings_as_errors: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            target: Target::OpenGl,
            directories: Vec::new(),
            global_header: None,
            global_header_files: Vec::new(),
            global_int_defines: BTreeMap::new(),
            global_float_defines: BTreeMap::new(),
            force_highp: false,
            treat_warnings_as_errors: false,
        }
    }
}

impl FactoryConfig {
    pub fn parse(content: &str) -> Result<Self, FactoryError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FactoryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FactoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = FactoryConfig::parse(
            r#"
target = "vulkan"
directories = ["shaders", "shaders/common/"]
global-header-files = ["common.h"]
force-highp = true

[global-int-defines]
MAX_LIGHTS = 8

[global-float-defines]
EPSILON = 0.001
"#,
        )
        .unwrap();
        assert_eq!(config.target, Target::Vulkan);
        assert_eq!(config.directories.len(), 2);
        assert_eq!(config.global_int_defines["MAX_LIGHTS"], 8);
        assert!(config.force_highp);
        assert!(!config.treat_warnings_as_errors);
        assert!(config.global_header.is_none());
    }

    #[test]
    fn test_empty_config_defaults() {
        assert_eq!(FactoryConfig::parse("").unwrap(), FactoryConfig::default());
    }

    #[test]
    fn test_bad_target_is_config_error() {
        match FactoryConfig::parse("target = \"glide\"") {
            Err(FactoryError::Config(message)) => assert!(message.contains("glide") || !message.is_empty()),
            other => panic!("expected a config error, got {:?}", other),
        }
    }
}
