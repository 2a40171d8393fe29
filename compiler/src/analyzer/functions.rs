//! Function ranges over the token stream
//!
//! A function does not own its tokens. It records where its header starts and
//! how many argument and body tokens follow, so every later insertion must go
//! through [`insert_tokens`] to keep the ranges valid.

use std::collections::BTreeSet;
use std::ops::Range;

use diagnostics::shader::ShaderDiagnostics;
use parser::{BaseType, IdentId, Symbol, Token, TokenKind};

use super::ShaderUnit;

/// `ret name ( args ) { body }` as offsets into the token stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Index of the return type token
    pub start: usize,
    pub arg_count: usize,
    pub body_count: usize,
    pub name: IdentId,
    pub is_entry: bool,
    /// Variables already added as parameters by Metal argument threading
    pub threaded: BTreeSet<IdentId>,
}

impl Function {
    pub fn name_index(&self) -> usize {
        self.start + 1
    }

    pub fn open_paren(&self) -> usize {
        self.start + 2
    }

    pub fn args(&self) -> Range<usize> {
        self.start + 3..self.close_paren()
    }

    pub fn close_paren(&self) -> usize {
        self.start + 3 + self.arg_count
    }

    pub fn open_brace(&self) -> usize {
        self.close_paren() + 1
    }

    pub fn body(&self) -> Range<usize> {
        let first = self.open_brace() + 1;
        first..first + self.body_count
    }

    pub fn close_brace(&self) -> usize {
        self.body().end
    }

    /// Header and argument tokens, up to and including `)`
    pub fn header(&self) -> Range<usize> {
        self.start..self.close_paren() + 1
    }
}

fn matching_open_paren(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        match tokens[i].kind {
            TokenKind::Symbol(Symbol::RightParen) => depth += 1,
            TokenKind::Symbol(Symbol::LeftParen) => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the `)` closing the `(` at `open`
pub(crate) fn matching_close_paren(tokens: &[Token], open: usize) -> Option<usize> {
    matching_forward(tokens, open, Symbol::LeftParen, Symbol::RightParen)
}

fn matching_forward(tokens: &[Token], open: usize, left: Symbol, right: Symbol) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.is_symbol(left) {
            depth += 1;
        } else if token.is_symbol(right) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Find every top-level `name ( args ) { body }` and the entry point
///
/// A `{` that is never closed, or a `}` with nothing to close, is an error.
pub fn discover(unit: &mut ShaderUnit) {
    unit.functions.clear();
    unit.entry_point = None;

    let main = unit.lookup("main");
    // top-level `{` not belonging to a function, e.g. struct bodies
    let mut open_braces: Vec<usize> = Vec::new();
    let mut i = 0;
    while i + 1 < unit.tokens.len() {
        let token = unit.tokens[i];
        if open_braces.is_empty()
            && token.is_symbol(Symbol::RightParen)
            && unit.tokens[i + 1].is_symbol(Symbol::LeftBrace)
        {
            let open = matching_open_paren(&unit.tokens, i);
            let Some(close_brace) = matching_forward(&unit.tokens, i + 1, Symbol::LeftBrace, Symbol::RightBrace)
            else {
                let span = unit.span_at(i + 1);
                unit.diagnostics.push(ShaderDiagnostics::unbalanced_braces(span));
                return;
            };

            let name = open
                .filter(|&open| open >= 2)
                .and_then(|open| unit.tokens[open - 1].identifier().map(|id| (open, id)));
            match name {
                Some((open, name)) => {
                    let start = open - 2;
                    let is_entry = unit.entry_point.is_none()
                        && Some(name) == main
                        && unit.tokens[start].type_id().is_some_and(|ty| {
                            unit.tables.ty(ty).base() == BaseType::Void
                        });
                    unit.functions.push(Function {
                        start,
                        arg_count: i - open - 1,
                        body_count: close_brace - (i + 2),
                        name,
                        is_entry,
                        threaded: BTreeSet::new(),
                    });
                    if is_entry {
                        unit.entry_point = Some(unit.functions.len() - 1);
                    }
                }
                None => {
                    let span = unit.span_at(open.unwrap_or(i));
                    unit.diagnostics.push(ShaderDiagnostics::unnamed_function(span));
                }
            }
            i = close_brace + 1;
            continue;
        }

        match token.kind {
            TokenKind::Symbol(Symbol::LeftBrace) => open_braces.push(i),
            TokenKind::Symbol(Symbol::RightBrace) => {
                if open_braces.pop().is_none() {
                    let span = unit.span_at(i);
                    unit.diagnostics.push(ShaderDiagnostics::unbalanced_braces(span));
                    return;
                }
            }
            _ => {}
        }
        i += 1;
    }

    if let Some(&unclosed) = open_braces.last() {
        let span = unit.span_at(unclosed);
        unit.diagnostics.push(ShaderDiagnostics::unbalanced_braces(span));
    }
}

/// Splice `new_tokens` in before `pos`, growing whichever range contains it
///
/// `pos` must not be a function's `{`: `)` and `{` stay adjacent.
pub fn insert_tokens(unit: &mut ShaderUnit, pos: usize, new_tokens: &[Token]) {
    let count = new_tokens.len();
    if count == 0 {
        return;
    }
    debug_assert!(
        unit.functions.iter().all(|function| function.open_brace() != pos),
        "insertion at token {} would separate a function header from its body",
        pos
    );
    unit.tokens.splice(pos..pos, new_tokens.iter().copied());
    for function in &mut unit.functions {
        if pos <= function.start {
            function.start += count;
        } else if pos <= function.close_paren() {
            function.arg_count += count;
        } else if pos > function.open_brace() && pos <= function.close_brace() {
            function.body_count += count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::analyzed;
    use super::*;
    use diagnostics::ShaderStage;
    use parser::token_text;

    fn text(unit: &ShaderUnit, range: Range<usize>) -> String {
        unit.tokens[range]
            .iter()
            .map(|t| token_text(t, &unit.tables))
            .collect::<Vec<_>>()
            .join(" ")
    }

    const SOURCE: &str = "float helper(float x) { return x * 2.0; }\n\
                          void main() { float y = helper(1.0); if (y > 1.0) { y = 0.0; } }\n";

    #[test]
    fn test_discovers_helpers_and_entry() {
        let mut unit = analyzed(ShaderStage::Vertex, SOURCE);
        discover(&mut unit);
        assert_eq!(unit.functions.len(), 2);

        let helper = &unit.functions[0];
        assert_eq!(unit.name(helper.name), "helper");
        assert!(!helper.is_entry);
        assert_eq!(text(&unit, helper.args()), "float x");
        assert_eq!(text(&unit, helper.body()), "return x * 2.0 ;");

        let entry = unit.entry().unwrap();
        assert_eq!(unit.name(entry.name), "main");
        assert!(unit.tokens[entry.close_brace()].is_symbol(Symbol::RightBrace));
        assert!(text(&unit, entry.body()).ends_with("y = 0.0 ; }"));
    }

    #[test]
    fn test_insert_tokens_keeps_ranges() {
        let mut unit = analyzed(ShaderStage::Vertex, SOURCE);
        discover(&mut unit);
        let a = unit.intern("a");
        let ident = Token::synthetic(TokenKind::Identifier(a));
        let comma = Token::synthetic(TokenKind::Symbol(Symbol::Comma));

        // Into helper's argument list
        let at = unit.functions[0].open_paren() + 1;
        insert_tokens(&mut unit, at, &[ident, comma]);
        // Into main's body
        let at = unit.functions[1].body().start;
        insert_tokens(&mut unit, at, &[ident, comma]);
        // Before everything
        insert_tokens(&mut unit, 0, &[comma]);

        let helper = &unit.functions[0];
        assert_eq!(text(&unit, helper.args()), "a , float x");
        assert_eq!(text(&unit, helper.body()), "return x * 2.0 ;");
        let entry = &unit.functions[1];
        assert!(text(&unit, entry.body()).starts_with("a , float y"));
        assert_eq!(unit.name(entry.name), "main");
        assert!(unit.tokens[entry.close_brace()].is_symbol(Symbol::RightBrace));
        assert_eq!(unit.tokens[entry.name_index()].identifier(), Some(entry.name));
    }

    #[test]
    fn test_insert_after_body_leaves_function_alone() {
        let mut unit = analyzed(ShaderStage::Vertex, SOURCE);
        discover(&mut unit);
        let before = unit.functions[0].clone();
        let at = before.close_brace() + 1;
        let comma = Token::synthetic(TokenKind::Symbol(Symbol::Comma));
        insert_tokens(&mut unit, at, &[comma]);
        assert_eq!(unit.functions[0], before);
        assert_eq!(unit.functions[1].start, before.close_brace() + 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "would separate a function header from its body")]
    fn test_insert_between_header_and_body_is_rejected() {
        let mut unit = analyzed(ShaderStage::Vertex, SOURCE);
        discover(&mut unit);
        let at = unit.functions[0].open_brace();
        let comma = Token::synthetic(TokenKind::Symbol(Symbol::Comma));
        insert_tokens(&mut unit, at, &[comma]);
    }

    #[test]
    fn test_unclosed_body_is_an_error() {
        let mut unit = analyzed(ShaderStage::Vertex, "uniform float x;\nvoid main() { gl_Position = vec4(x);\n");
        discover(&mut unit);
        assert!(unit.functions.is_empty());
        let error = unit.diagnostics.errors().next().unwrap();
        assert_eq!(error.code.as_deref(), Some("E0009"));
        assert_eq!(error.span.start.line, 2);
    }

    #[test]
    fn test_stray_braces_are_errors() {
        let mut unit = analyzed(ShaderStage::Vertex, "void main() { }\n}\n");
        discover(&mut unit);
        assert_eq!(unit.diagnostics.errors().count(), 1);

        let mut unit = analyzed(ShaderStage::Vertex, "struct Open { vec3 p;\nvoid main() { }\n");
        discover(&mut unit);
        assert!(unit.diagnostics.errors().any(|d| d.code.as_deref() == Some("E0009")));
    }

    #[test]
    fn test_block_without_name_is_reported() {
        let mut unit = analyzed(ShaderStage::Vertex, "(x) { }\nvoid main() { }\n");
        discover(&mut unit);
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.diagnostics.warnings().count(), 1);
    }
}
