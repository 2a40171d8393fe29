//! Diagnostics of the shader translator
//!
//! Every problem found while translating a stage becomes a [`Diagnostic`]
//! carrying a severity, a stable `E00NN` code, the stage it belongs to and a
//! span. Spans start out relative to the assembled stage text and are moved
//! onto the originating header or stage file with [`Diagnostics::remap_spans`]
//! before [`ErrorFormatter`] prints them with a source excerpt.

use std::fmt;

pub use source_map::{AssembledSource, FileId, SourceFile, SourceMap, SourcePosition, SourceSpan};

mod stage;
pub use stage::ShaderStage;

pub mod shader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    /// The stage produces no output
    Error,
    /// Output is produced but may not compile on the device
    Warning,
    /// Input that was deliberately skipped
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        })
    }
}

/// Text shown under the underlined token
#[derive(Debug, Clone)]
pub struct Label {
    pub span: SourceSpan,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub span: SourceSpan,
    /// Set by the pipeline once the failing stage is known
    pub stage: Option<ShaderStage>,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(code) = &self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)?;
        if !self.span.is_dummy() {
            write!(f, " at {}:{}", self.span.start.line, self.span.start.column)?;
        }
        Ok(())
    }
}

/// Diagnostics of one stage, in the order they were found
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    fn with_severity(&self, severity: DiagnosticSeverity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(DiagnosticSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(DiagnosticSeverity::Warning)
    }

    pub fn infos(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(DiagnosticSeverity::Info)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// Turn every warning into an error, returning how many were promoted
    pub fn promote_warnings(&mut self) -> usize {
        let mut promoted = 0;
        for diagnostic in &mut self.diagnostics {
            if diagnostic.severity == DiagnosticSeverity::Warning {
                diagnostic.severity = DiagnosticSeverity::Error;
                promoted += 1;
            }
        }
        promoted
    }

    /// Tag every diagnostic that has no stage yet
    pub fn set_stage(&mut self, stage: ShaderStage) {
        for diagnostic in &mut self.diagnostics {
            diagnostic.stage.get_or_insert(stage);
        }
    }

    /// Rewrite spans, e.g. from assembled-source lines to file lines
    pub fn remap_spans(&mut self, remap: impl Fn(&SourceSpan) -> Option<SourceSpan>) {
        for diagnostic in &mut self.diagnostics {
            let spans = std::iter::once(&mut diagnostic.span)
                .chain(diagnostic.labels.iter_mut().map(|label| &mut label.span));
            for span in spans {
                if let Some(moved) = remap(span) {
                    *span = moved;
                }
            }
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    fn with_severity(severity: DiagnosticSeverity, message: String, span: SourceSpan) -> Self {
        Self {
            diagnostic: Diagnostic {
                severity,
                code: None,
                message,
                span,
                stage: None,
                labels: Vec::new(),
                notes: Vec::new(),
                help: Vec::new(),
            },
        }
    }

    pub fn error(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, message.into(), span)
    }

    pub fn warning(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, message.into(), span)
    }

    pub fn info(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::with_severity(DiagnosticSeverity::Info, message.into(), span)
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.diagnostic.code = Some(code.into());
        self
    }

    pub fn stage(mut self, stage: ShaderStage) -> Self {
        self.diagnostic.stage = Some(stage);
        self
    }

    pub fn label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.diagnostic.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.diagnostic.notes.push(note.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic.help.push(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }
}

/// Plain-text rendering with the offending line of the header or stage file
///
/// ```text
/// error[E0001]: tokenization failed at 3:8
///   --> lit.fs:3:8 (vertex stage)
///   |
/// 3 |     x = 3 $ 4;
///   |       ^ unexpected character '$'
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFormatter;

impl ErrorFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics, source_map: &SourceMap) -> String {
        diagnostics
            .iter()
            .map(|diagnostic| self.format_diagnostic(diagnostic, source_map))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
        let mut output = String::new();
        output.push_str(&diagnostic.severity.to_string());
        if let Some(code) = &diagnostic.code {
            output.push_str(&format!("[{}]", code));
        }
        output.push_str(&format!(": {}\n", diagnostic.message));

        let span = &diagnostic.span;
        let stage = diagnostic
            .stage
            .map(|s| format!(" ({} stage)", s))
            .unwrap_or_default();
        let file = source_map.get_file(span.file_id);

        match file {
            Some(file) => output.push_str(&format!(
                "  --> {}:{}:{}{}\n",
                file.name, span.start.line, span.start.column, stage
            )),
            None if !span.is_dummy() => {
                output.push_str(&format!("  --> {}:{}{}\n", span.start.line, span.start.column, stage))
            }
            None if !stage.is_empty() => output.push_str(&format!("  -->{}\n", stage)),
            None => {}
        }

        if let Some(line) = file.and_then(|file| file.get_line(span.start.line)) {
            let gutter = span.start.line.to_string();
            let pad = " ".repeat(gutter.len());
            let width = if span.end.line == span.start.line {
                span.end.column.saturating_sub(span.start.column).max(1)
            } else {
                1
            };
            output.push_str(&format!("{} |\n{} | {}\n", pad, gutter, line));
            output.push_str(&format!(
                "{} | {}{}",
                pad,
                " ".repeat(span.start.column.saturating_sub(1)),
                "^".repeat(width)
            ));
            if let Some(label) = diagnostic.labels.first() {
                output.push_str(&format!(" {}", label.message));
            }
            output.push('\n');
        }

        for help in &diagnostic.help {
            output.push_str(&format!("  = help: {}\n", help));
        }
        for note in &diagnostic.notes {
            output.push_str(&format!("  = note: {}\n", note));
        }
        output
    }
}

/// Result type that carries diagnostics on failure
pub type DiagnosticResult<T> = Result<T, Diagnostics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_builder() {
        let span = SourceSpan::on_line(FileId::new(0), 1, 5, 1);

        let diagnostic = DiagnosticBuilder::error("unsupported type 'mat4'", span.clone())
            .code("E0006")
            .stage(ShaderStage::Fragment)
            .label(span, "here")
            .help("use vec4 attributes")
            .note("reflection needs a vertex format")
            .build();

        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.code.as_deref(), Some("E0006"));
        assert_eq!(diagnostic.stage, Some(ShaderStage::Fragment));
        assert_eq!(diagnostic.labels.len(), 1);
        assert_eq!(diagnostic.to_string(), "error[E0006]: unsupported type 'mat4' at 1:5");
    }

    #[test]
    fn test_promote_warnings() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(DiagnosticBuilder::warning("w", SourceSpan::dummy()).build());
        diagnostics.push(DiagnosticBuilder::info("i", SourceSpan::dummy()).build());
        assert!(!diagnostics.has_errors());

        assert_eq!(diagnostics.promote_warnings(), 1);
        assert!(diagnostics.has_errors());
        assert!(!diagnostics.has_warnings());
        assert_eq!(diagnostics.infos().count(), 1);
    }

    #[test]
    fn test_remap_moves_labels_too() {
        let span = SourceSpan::on_line(FileId::new(0), 7, 2, 1);
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(DiagnosticBuilder::error("e", span.clone()).label(span, "here").build());
        diagnostics.push(DiagnosticBuilder::error("stage-wide", SourceSpan::dummy()).build());

        diagnostics.remap_spans(|span| {
            (!span.is_dummy()).then(|| SourceSpan::on_line(FileId::new(3), span.start.line - 5, span.start.column, 1))
        });
        let first = &diagnostics.diagnostics[0];
        assert_eq!(first.span.start.line, 2);
        assert_eq!(first.labels[0].span.file_id, FileId::new(3));
        assert!(diagnostics.diagnostics[1].span.is_dummy());
    }

    #[test]
    fn test_format_with_snippet() {
        let mut map = SourceMap::new();
        let file = map.add_file("lit.fs", "void main()\n{\n\tx = 3 $ 4;\n}\n");
        let span = SourceSpan::on_line(file, 3, 8, 1);
        let diagnostic = DiagnosticBuilder::error("tokenization failed at 3:8", span.clone())
            .code("E0001")
            .stage(ShaderStage::Vertex)
            .label(span, "unexpected character '$'")
            .build();

        let text = ErrorFormatter::new().format_diagnostic(&diagnostic, &map);
        assert!(text.starts_with("error[E0001]: tokenization failed at 3:8\n"));
        assert!(text.contains("--> lit.fs:3:8 (vertex stage)"));
        assert!(text.contains("3 | \tx = 3 $ 4;"));
        assert!(text.ends_with("  |        ^ unexpected character '$'\n"), "{}", text);
    }

    #[test]
    fn test_stage_wide_error_has_no_excerpt() {
        let diagnostic = shader::ShaderDiagnostics::missing_entry_point(ShaderStage::Compute);
        let text = ErrorFormatter::new().format_diagnostic(&diagnostic, &SourceMap::new());
        assert_eq!(
            text,
            "error[E0010]: compute stage has no `void main()` entry point\n  --> (compute stage)\n"
        );
    }
}
