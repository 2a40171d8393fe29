//! Shader-specific diagnostic builders
//!
//! Helper constructors for the problems the shader front end and backends
//! report. Codes are stable and explained by `kslc explain <code>`.

use crate::{Diagnostic, DiagnosticBuilder, ShaderStage, SourceSpan};

/// Provides common shader diagnostic builders
pub struct ShaderDiagnostics;

impl ShaderDiagnostics {
    /// First character the lexer could not match
    pub fn tokenization_failed(span: SourceSpan, found: char) -> Diagnostic {
        let (line, column) = (span.start.line, span.start.column);
        DiagnosticBuilder::error(format!("tokenization failed at {}:{}", line, column), span.clone())
            .code("E0001")
            .label(span, format!("unexpected character '{}'", found.escape_default()))
            .build()
    }

    /// Signed literal that does not fit in 32 bits
    pub fn signed_literal_overflow(span: SourceSpan, literal: &str) -> Diagnostic {
        let (line, column) = (span.start.line, span.start.column);
        DiagnosticBuilder::warning(
            format!(
                "too large signed integer literal: ({}) at {}:{}. May cause compile error",
                literal, line, column
            ),
            span.clone(),
        )
        .code("E0002")
        .label(span, "exceeds the signed 32-bit range")
        .help(format!("add a `u` suffix if the value is meant to be unsigned: {}u", literal))
        .build()
    }

    pub fn malformed_struct(span: SourceSpan, name: Option<&str>) -> Diagnostic {
        let what = name.map(|n| format!("struct '{}'", n)).unwrap_or_else(|| "struct".to_string());
        DiagnosticBuilder::warning(format!("unable to parse {}", what), span.clone())
            .code("E0003")
            .label(span, "struct body is not a list of `type name;` members")
            .note("an `#error` placeholder is emitted in place of the struct")
            .build()
    }

    pub fn skipped_declaration(span: SourceSpan, name: &str, reason: &str) -> Diagnostic {
        DiagnosticBuilder::info(format!("declaration of '{}' skipped: {}", name, reason), span)
            .code("E0004")
            .build()
    }

    pub fn unnamed_function(span: SourceSpan) -> Diagnostic {
        DiagnosticBuilder::warning("function body without a name", span.clone())
            .code("E0005")
            .label(span, "expected an identifier before `(`")
            .build()
    }

    pub fn unsupported_type(span: SourceSpan, ty: &str, context: &str) -> Diagnostic {
        DiagnosticBuilder::error(format!("unsupported type '{}' for {}", ty, context), span)
            .code("E0006")
            .build()
    }

    pub fn unsupported_stage(stage: ShaderStage, backend: &str) -> Diagnostic {
        DiagnosticBuilder::error(
            format!("{} stage is not supported by the {} backend", stage, backend),
            SourceSpan::dummy(),
        )
        .code("E0007")
        .stage(stage)
        .build()
    }

    pub fn warnings_as_errors(count: usize) -> Diagnostic {
        DiagnosticBuilder::error(
            format!("{} warning(s) treated as errors", count),
            SourceSpan::dummy(),
        )
        .code("E0008")
        .build()
    }

    pub fn unbalanced_braces(span: SourceSpan) -> Diagnostic {
        DiagnosticBuilder::error("unbalanced braces", span.clone())
            .code("E0009")
            .label(span, "this `{` is never closed")
            .build()
    }

    pub fn missing_entry_point(stage: ShaderStage) -> Diagnostic {
        DiagnosticBuilder::error(
            format!("{} stage has no `void main()` entry point", stage),
            SourceSpan::dummy(),
        )
        .code("E0010")
        .stage(stage)
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiagnosticSeverity, FileId};

    #[test]
    fn test_tokenization_message() {
        let d = ShaderDiagnostics::tokenization_failed(SourceSpan::on_line(FileId::new(0), 4, 12, 1), '$');
        assert_eq!(d.message, "tokenization failed at 4:12");
        assert_eq!(d.code.as_deref(), Some("E0001"));
    }

    #[test]
    fn test_structural_errors() {
        let d = ShaderDiagnostics::unbalanced_braces(SourceSpan::on_line(FileId::new(0), 2, 13, 1));
        assert_eq!(d.severity, DiagnosticSeverity::Error);
        assert_eq!(d.code.as_deref(), Some("E0009"));

        let d = ShaderDiagnostics::missing_entry_point(ShaderStage::Fragment);
        assert_eq!(d.message, "fragment stage has no `void main()` entry point");
        assert_eq!(d.stage, Some(ShaderStage::Fragment));
    }

    #[test]
    fn test_overflow_is_warning() {
        let d = ShaderDiagnostics::signed_literal_overflow(SourceSpan::on_line(FileId::new(0), 1, 9, 10), "4294967295");
        assert_eq!(d.severity, DiagnosticSeverity::Warning);
        assert_eq!(
            d.message,
            "too large signed integer literal: (4294967295) at 1:9. May cause compile error"
        );
    }
}
