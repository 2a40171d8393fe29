//! Line mapping for assembled shader stages
//!
//! A stage is compiled from one text stitched together out of generated
//! `#define` lines, shared header files and the stage file itself. The
//! [`SourceMap`] keeps every piece, and [`AssembledSource`] maps a line of the
//! stitched text back to the piece and line it came from, so diagnostics point
//! at what the shader author wrote.

use std::fmt;

/// Line and column, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

/// Columns `start..end` of one file, possibly across lines
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
    pub file_id: FileId,
}

impl SourceSpan {
    /// The `len` columns of a token starting at `line:column`
    pub fn on_line(file_id: FileId, line: usize, column: usize, len: usize) -> Self {
        Self {
            start: SourcePosition { line, column },
            end: SourcePosition {
                line,
                column: column + len.max(1),
            },
            file_id,
        }
    }

    /// Stage-wide problems that belong to no token
    pub fn dummy() -> Self {
        Self::on_line(FileId::NONE, 0, 0, 0)
    }

    pub fn is_dummy(&self) -> bool {
        self.file_id == FileId::NONE
    }
}

/// Index of a piece registered in a [`SourceMap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(usize);

impl FileId {
    const NONE: FileId = FileId(usize::MAX);

    pub fn new(id: usize) -> Self {
        Self(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file #{}", self.0)
    }
}

/// One header, stage file or block of generated defines
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    /// Text of a 1-based line without its line terminator
    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        let index = line_number.checked_sub(1)?;
        self.content.split('\n').nth(index).map(|line| line.trim_end_matches('\r'))
    }
}

/// Every piece that went into one assembled stage, indexed by [`FileId`]
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) -> FileId {
        self.files.push(SourceFile {
            name: name.into(),
            content: content.into(),
        });
        FileId(self.files.len() - 1)
    }

    pub fn get_file(&self, file_id: FileId) -> Option<&SourceFile> {
        self.files.get(file_id.0)
    }

    pub fn file_name(&self, file_id: FileId) -> Option<&str> {
        self.get_file(file_id).map(|file| file.name.as_str())
    }
}

/// Assembled lines `first_line..first_line + line_count` taken from one piece
#[derive(Debug, Clone, Copy)]
struct Segment {
    file_id: FileId,
    first_line: usize,
    line_count: usize,
}

/// The stitched text a stage is compiled from
#[derive(Debug, Clone)]
pub struct AssembledSource {
    text: String,
    segments: Vec<Segment>,
    next_line: usize,
}

impl Default for AssembledSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AssembledSource {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            segments: Vec::new(),
            next_line: 1,
        }
    }

    /// Append a header or stage file, terminated by a newline
    pub fn append_file(&mut self, map: &mut SourceMap, name: &str, content: &str) -> FileId {
        let file_id = map.add_file(name, content);
        self.text.push_str(content);
        self.text.push('\n');
        self.record(file_id, content.matches('\n').count() + 1);
        file_id
    }

    /// Append generated lines verbatim, e.g. the define prologue
    pub fn append_text(&mut self, map: &mut SourceMap, name: &str, text: &str) -> FileId {
        let file_id = map.add_file(name, text);
        self.text.push_str(text);
        self.record(file_id, text.matches('\n').count());
        file_id
    }

    fn record(&mut self, file_id: FileId, line_count: usize) {
        if line_count == 0 {
            return;
        }
        self.segments.push(Segment {
            file_id,
            first_line: self.next_line,
            line_count,
        });
        self.next_line += line_count;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Piece and local line of an assembled line
    pub fn resolve(&self, line: usize) -> Option<(FileId, usize)> {
        let index = self
            .segments
            .partition_point(|s| s.first_line + s.line_count <= line);
        let segment = self.segments.get(index)?;
        if line < segment.first_line {
            return None;
        }
        Some((segment.file_id, line - segment.first_line + 1))
    }

    /// Move a span over the assembled text onto the piece it starts in
    pub fn resolve_span(&self, span: &SourceSpan) -> Option<SourceSpan> {
        let (file_id, start_line) = self.resolve(span.start.line)?;
        let end_line = match self.resolve(span.end.line) {
            Some((end_file, end_line)) if end_file == file_id => end_line,
            _ => start_line,
        };
        Some(SourceSpan {
            start: SourcePosition {
                line: start_line,
                column: span.start.column,
            },
            end: SourcePosition {
                line: end_line,
                column: span.end.column,
            },
            file_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_of_a_piece() {
        let mut map = SourceMap::new();
        let id = map.add_file("blur.fs", "uniform float r;\r\nvoid main()\n{\n}");
        let file = map.get_file(id).unwrap();

        assert_eq!(file.get_line(1), Some("uniform float r;"));
        assert_eq!(file.get_line(4), Some("}"));
        assert_eq!(file.get_line(5), None);
        assert_eq!(file.get_line(0), None);
        assert_eq!(map.file_name(id), Some("blur.fs"));
    }

    #[test]
    fn test_dummy_span_belongs_to_no_file() {
        assert!(SourceSpan::dummy().is_dummy());
        assert!(!SourceSpan::on_line(FileId::new(0), 1, 1, 3).is_dummy());
        assert_eq!(SourceSpan::on_line(FileId::new(0), 2, 5, 0).end.column, 6);
    }

    #[test]
    fn test_assembled_resolution() {
        let mut map = SourceMap::new();
        let mut assembled = AssembledSource::new();
        let defines = assembled.append_text(&mut map, "<defines>", "#define A 1\n#define B 2\n");
        let header = assembled.append_file(&mut map, "common.h", "float f;");
        let stage = assembled.append_file(&mut map, "main.fs", "void main()\n{\n}\n");

        assert_eq!(assembled.resolve(1), Some((defines, 1)));
        assert_eq!(assembled.resolve(2), Some((defines, 2)));
        assert_eq!(assembled.resolve(3), Some((header, 1)));
        assert_eq!(assembled.resolve(4), Some((stage, 1)));
        assert_eq!(assembled.resolve(6), Some((stage, 3)));
        assert_eq!(assembled.resolve(0), None);
        assert!(assembled.text().starts_with("#define A 1\n#define B 2\nfloat f;\nvoid main()"));
    }

    #[test]
    fn test_empty_prologue_takes_no_lines() {
        let mut map = SourceMap::new();
        let mut assembled = AssembledSource::new();
        assembled.append_text(&mut map, "<defines>", "");
        let stage = assembled.append_file(&mut map, "main.vs", "void main() { }");
        assert_eq!(assembled.resolve(1), Some((stage, 1)));
    }

    #[test]
    fn test_resolve_span_into_file() {
        let mut map = SourceMap::new();
        let mut assembled = AssembledSource::new();
        assembled.append_text(&mut map, "<defines>", "#define A 1\n");
        let stage = assembled.append_file(&mut map, "main.fs", "a\nb $ c\n");

        let span = SourceSpan::on_line(FileId::new(0), 3, 3, 1);
        let resolved = assembled.resolve_span(&span).unwrap();
        assert_eq!(resolved.file_id, stage);
        assert_eq!(resolved.start.line, 2);
        assert_eq!(map.get_file(stage).unwrap().get_line(2), Some("b $ c"));
    }
}
