//! Registry of the stable diagnostic codes
//!
//! Every diagnostic the translator reports carries one of these codes so
//! tooling can look up a longer explanation (`kslc explain E0003`).
//!
//! # Code Ranges
//!
//! - E0001-E0002: lexical problems
//! - E0003-E0005: tolerated semantic problems (skipped or placeholder output)
//! - E0006-E0007: unsupported input for the selected backend
//! - E0008: policy failures
//! - E0009-E0010: structural errors in the stage source

use std::collections::HashMap;
use std::fmt;

/// Error code struct containing the numeric code and human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// The numeric error code (e.g., 3)
    pub code: u16,
    pub category: &'static str,
    pub description: &'static str,
    /// Optional help text with suggestions for fixing the problem
    pub help: Option<&'static str>,
}

impl ErrorCode {
    pub const fn new(
        code: u16,
        category: &'static str,
        description: &'static str,
        help: Option<&'static str>,
    ) -> Self {
        Self {
            code,
            category,
            description,
            help,
        }
    }

    /// Format the error code as "E{code:04}" (e.g., "E0003")
    pub fn format_code(&self) -> String {
        format!("E{:04}", self.code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.format_code(),
            self.category,
            self.description
        )
    }
}

const CODES: &[ErrorCode] = &[
    ErrorCode::new(
        1,
        "Lexer",
        "Tokenization failed",
        Some("Remove or replace the character the lexer stopped at; scanning does not recover"),
    ),
    ErrorCode::new(
        2,
        "Lexer",
        "Signed integer literal exceeds the 32-bit range",
        Some("Add a `u` suffix for unsigned values or reduce the literal"),
    ),
    ErrorCode::new(
        3,
        "Analyzer",
        "Malformed struct definition",
        Some("Struct members must be `type name;` or `type name[N];`"),
    ),
    ErrorCode::new(
        4,
        "Analyzer",
        "Declaration skipped",
        Some("Storage-qualified declarations must be `qualifier type name;`, `name[N];` or, for buffers, `name[];`"),
    ),
    ErrorCode::new(
        5,
        "Analyzer",
        "Function body without a name",
        Some("A `(...) {` block at top level must be preceded by a function name"),
    ),
    ErrorCode::new(
        6,
        "Backend",
        "Unsupported type",
        Some("Vertex inputs must be float, vec2, vec3 or vec4"),
    ),
    ErrorCode::new(
        7,
        "Backend",
        "Unsupported stage",
        Some("Geometry stages translate on GLSL targets only; tessellation stages are passed through by the shader factory"),
    ),
    ErrorCode::new(
        8,
        "Policy",
        "Warnings treated as errors",
        Some("Fix the reported warnings or disable treat_warnings_as_errors"),
    ),
    ErrorCode::new(
        9,
        "Analyzer",
        "Unbalanced braces",
        Some("Every `{` must be closed before the end of the stage source"),
    ),
    ErrorCode::new(
        10,
        "Analyzer",
        "Missing entry point",
        Some("Each translated stage needs a top-level `void main()` function"),
    ),
];

/// Registry containing all defined error codes
pub struct ErrorCodeRegistry {
    codes: HashMap<u16, ErrorCode>,
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorCodeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            codes: HashMap::new(),
        };
        for code in CODES {
            registry.register(code.clone());
        }
        registry
    }

    pub fn get(&self, code: u16) -> Option<&ErrorCode> {
        self.codes.get(&code)
    }

    /// Get an error code by its formatted string (e.g., "E0003")
    pub fn get_by_string(&self, code_str: &str) -> Option<&ErrorCode> {
        parse_error_code(code_str).and_then(|code| self.get(code))
    }

    fn register(&mut self, error_code: ErrorCode) {
        self.codes.insert(error_code.code, error_code);
    }

    /// All codes in ascending order
    pub fn all(&self) -> Vec<&ErrorCode> {
        let mut codes: Vec<&ErrorCode> = self.codes.values().collect();
        codes.sort_by_key(|code| code.code);
        codes
    }

    pub fn get_by_category(&self, category: &str) -> Vec<&ErrorCode> {
        self.all()
            .into_iter()
            .filter(|code| code.category == category)
            .collect()
    }

    pub fn is_valid_code(&self, code: u16) -> bool {
        self.codes.contains_key(&code)
    }
}

static REGISTRY: std::sync::OnceLock<ErrorCodeRegistry> = std::sync::OnceLock::new();

/// Get the global error code registry
pub fn error_registry() -> &'static ErrorCodeRegistry {
    REGISTRY.get_or_init(ErrorCodeRegistry::new)
}

pub fn get_error_code(code: u16) -> Option<&'static ErrorCode> {
    error_registry().get(code)
}

/// Helper function to format error code string (e.g., 3 -> "E0003")
pub fn format_error_code(code: u16) -> String {
    format!("E{:04}", code)
}

/// Helper function to parse error code from string (e.g., "E0003" -> Some(3))
pub fn parse_error_code(code_str: &str) -> Option<u16> {
    code_str
        .strip_prefix('E')
        .or_else(|| code_str.strip_prefix('e'))
        .and_then(|digits| digits.parse::<u16>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_functionality() {
        let registry = ErrorCodeRegistry::new();

        let malformed = registry.get(3).unwrap();
        assert_eq!(malformed.description, "Malformed struct definition");
        assert_eq!(malformed.format_code(), "E0003");

        let by_string = registry.get_by_string("E0006").unwrap();
        assert_eq!(by_string.category, "Backend");

        assert!(registry.get(999).is_none());
        assert!(registry.get_by_string("INVALID").is_none());
    }

    #[test]
    fn test_codes_are_contiguous() {
        let codes: Vec<u16> = error_registry().all().iter().map(|c| c.code).collect();
        assert_eq!(codes, (1..=10).collect::<Vec<_>>());
        assert_eq!(error_registry().get_by_category("Lexer").len(), 2);
        assert_eq!(error_registry().get_by_category("Analyzer").len(), 5);
    }

    #[test]
    fn test_helper_functions() {
        assert_eq!(format_error_code(8), "E0008");
        assert_eq!(parse_error_code("E0042"), Some(42));
        assert_eq!(parse_error_code("0042"), None);
        assert!(get_error_code(1).is_some());
    }
}
