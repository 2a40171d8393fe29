//! Scanner for the shading dialect
//!
//! A single left-to-right pass built from nom combinators over a
//! `LocatedSpan`, so every token knows its line and column. The scanner does
//! not recover: the first character it cannot match ends the scan with one
//! error diagnostic.

use diagnostics::shader::ShaderDiagnostics;
use diagnostics::{Diagnostics, FileId, SourceSpan};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while};
use nom::character::complete::{char, digit1, hex_digit1, multispace1, not_line_ending, one_of, satisfy};
use nom::combinator::{opt, recognize};
use nom::error::ErrorKind;
use nom::sequence::{pair, preceded};
use nom::{IResult, Parser};
use nom_locate::LocatedSpan;

use crate::tables::{NumberKind, NumberLiteral, SymbolTables};
use crate::token::{Builtin, Keyword, Symbol, Token, TokenKind, SYMBOLS};

pub type Span<'a> = LocatedSpan<&'a str>;

type LexResult<'a, T> = IResult<Span<'a>, T>;

fn comment(input: Span) -> LexResult<Span> {
    alt((
        recognize(pair(tag("//"), not_line_ending)),
        recognize((tag("/*"), take_until("*/"), tag("*/"))),
    ))
    .parse(input)
}

fn macro_line(input: Span) -> LexResult<Span> {
    recognize(pair(char('#'), not_line_ending)).parse(input)
}

fn symbol(input: Span) -> LexResult<Symbol> {
    for (text, symbol) in SYMBOLS {
        if let Ok((rest, _)) = tag::<_, Span, nom::error::Error<Span>>(*text).parse(input) {
            return Ok((rest, *symbol));
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Tag)))
}

fn identifier(input: Span) -> LexResult<Span> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn decimal_digits(input: Span) -> LexResult<Span> {
    digit1(input)
}

fn hex_digits(input: Span) -> LexResult<Span> {
    recognize(preceded(alt((tag("0x"), tag("0X"))), hex_digit1)).parse(input)
}

/// `int . frac`, optional exponent, optional `h`/`f` suffix
fn float_literal(input: Span) -> LexResult<(Span, Option<char>)> {
    pair(
        recognize((
            decimal_digits,
            char('.'),
            decimal_digits,
            opt((one_of("eE"), opt(one_of("+-")), decimal_digits)),
        )),
        opt(one_of("hfF")),
    )
    .parse(input)
}

/// Decimal or `0x` hex digits with an optional unsigned suffix
fn integer_literal(input: Span) -> LexResult<(Span, bool, Option<char>)> {
    (
        alt((hex_digits.map(|d| (d, true)), decimal_digits.map(|d| (d, false)))),
        opt(one_of("uU")),
    )
        .map(|((digits, is_hex), suffix)| (digits, is_hex, suffix))
        .parse(input)
}

/// Token scanner that collects diagnostics across calls
pub struct Lexer {
    file_id: FileId,
    diagnostics: Diagnostics,
    failed: bool,
}

impl Lexer {
    pub fn new(file_id: FileId) -> Self {
        Self { file_id, diagnostics: Diagnostics::new(), failed: false }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// True once a scan stopped on an unmatched character
    pub fn failed(&self) -> bool {
        self.failed
    }

    fn span(&self, line: u32, column: u32, len: usize) -> SourceSpan {
        SourceSpan::on_line(self.file_id, line as usize, column as usize, len)
    }

    /// Scan `source`, interning into `tables`; reserved words and built-ins
    /// are resolved before returning
    pub fn scan(&mut self, source: &str, tables: &mut SymbolTables) -> Vec<Token> {
        let mut input = Span::new(source);
        let mut tokens = Vec::new();

        while !input.fragment().is_empty() {
            let line = input.location_line();
            let column = input.get_utf8_column() as u32;

            if let Ok((rest, _)) = multispace1::<Span, nom::error::Error<Span>>(input) {
                input = rest;
                continue;
            }
            if let Ok((rest, _)) = comment(input) {
                input = rest;
                continue;
            }
            if let Ok((rest, text)) = macro_line(input) {
                let id = tables.add_macro(text.fragment().trim_end());
                tokens.push(Token::new(TokenKind::Macro(id), line, column));
                input = rest;
                continue;
            }
            if let Ok((rest, symbol)) = symbol(input) {
                tokens.push(Token::new(TokenKind::Symbol(symbol), line, column));
                input = rest;
                continue;
            }
            if let Ok((rest, name)) = identifier(input) {
                let id = tables.intern(name.fragment());
                tokens.push(Token::new(TokenKind::Identifier(id), line, column));
                input = rest;
                continue;
            }
            if let Ok((rest, (digits, suffix))) = float_literal(input) {
                let kind = match suffix {
                    Some('h') => NumberKind::Half,
                    _ => NumberKind::Float,
                };
                let value = digits.fragment().parse::<f64>().unwrap_or(0.0);
                let id = tables.add_number(NumberLiteral { text: digits.fragment().to_string(), kind, value });
                tokens.push(Token::new(TokenKind::Number(id), line, column));
                input = rest;
                continue;
            }
            if let Ok((rest, (digits, is_hex, suffix))) = integer_literal(input) {
                let text = *digits.fragment();
                let parsed = if is_hex {
                    u64::from_str_radix(&text[2..], 16)
                } else {
                    text.parse::<u64>()
                };
                let value = parsed.unwrap_or(u64::MAX);
                let kind = if suffix.is_some() { NumberKind::Uint } else { NumberKind::Int };
                if kind == NumberKind::Int && value > i32::MAX as u64 {
                    self.diagnostics.push(ShaderDiagnostics::signed_literal_overflow(
                        self.span(line, column, text.len()),
                        text,
                    ));
                }
                let id = tables.add_number(NumberLiteral { text: text.to_string(), kind, value: value as f64 });
                tokens.push(Token::new(TokenKind::Number(id), line, column));
                input = rest;
                continue;
            }

            let found = input.fragment().chars().next().unwrap_or('\0');
            log::debug!("tokenization stopped at {}:{} on {:?}", line, column, found);
            self.diagnostics
                .push(ShaderDiagnostics::tokenization_failed(self.span(line, column, 1), found));
            self.failed = true;
            break;
        }

        resolve_reserved(&mut tokens, tables);
        tokens
    }
}

/// Retag identifiers that spell a reserved word, built-in function or type
fn resolve_reserved(tokens: &mut [Token], tables: &SymbolTables) {
    for token in tokens.iter_mut() {
        let Some(id) = token.identifier() else { continue };
        let text = tables.identifier(id);
        if let Some(keyword) = Keyword::from_source(text) {
            token.kind = TokenKind::Reserved(keyword);
        } else if let Some(builtin) = Builtin::from_source(text) {
            token.kind = TokenKind::Builtin(builtin);
        } else if let Some(type_id) = tables.type_id(text) {
            token.kind = TokenKind::Type(type_id);
        }
    }
}

/// Register struct names as types, retag their uses and append the sentinel
pub fn finish(tokens: &mut Vec<Token>, tables: &mut SymbolTables) {
    let mut struct_names = Vec::new();
    for pair in tokens.windows(2) {
        if !pair[0].is_keyword(Keyword::Struct) {
            continue;
        }
        if let Some(id) = pair[1].identifier() {
            struct_names.push(id);
        }
    }

    for id in struct_names {
        let name = tables.identifier(id).to_string();
        let type_id = tables.add_struct_type(&name);
        for token in tokens.iter_mut() {
            if token.identifier() == Some(id) {
                token.kind = TokenKind::Type(type_id);
            }
        }
    }

    tokens.push(Token::synthetic(TokenKind::EndOfTokens));
}

/// Source spelling of a token, as the lexer saw it
pub fn token_text(token: &Token, tables: &SymbolTables) -> String {
    match token.kind {
        TokenKind::Reserved(keyword) => keyword.as_str().to_string(),
        TokenKind::Identifier(id) => tables.identifier(id).to_string(),
        TokenKind::Number(id) => {
            let literal = tables.number(id);
            match literal.kind {
                NumberKind::Half => format!("{}h", literal.text),
                NumberKind::Uint => format!("{}u", literal.text),
                _ => literal.text.clone(),
            }
        }
        TokenKind::Macro(id) => tables.macro_text(id).to_string(),
        TokenKind::Type(id) => tables.type_entry(id).name.clone(),
        TokenKind::Symbol(symbol) => symbol.as_str().to_string(),
        TokenKind::Builtin(builtin) => builtin.as_str().to_string(),
        TokenKind::EndOfTokens => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> (Vec<Token>, SymbolTables, Lexer) {
        let mut tables = SymbolTables::new();
        let mut lexer = Lexer::new(FileId::new(0));
        let tokens = lexer.scan(source, &mut tables);
        (tokens, tables, lexer)
    }

    #[test]
    fn test_longest_match() {
        let (tokens, _, _) = scan("<<=");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_symbol(Symbol::LessLessEqual));

        let (tokens, _, _) = scan("a<<b");
        assert!(tokens[1].is_symbol(Symbol::LessLess));
    }

    #[test]
    fn test_float_before_int() {
        let (tokens, tables, _) = scan("12.5");
        assert_eq!(tokens.len(), 1);
        let literal = tables.number(tokens[0].number().unwrap());
        assert_eq!(literal.kind, NumberKind::Float);
        assert_eq!(literal.value, 12.5);
    }

    #[test]
    fn test_number_suffixes() {
        let (tokens, tables, lexer) = scan("0.5h 0x1Fu 7 2.0f");
        let kinds: Vec<_> = tokens.iter().map(|t| tables.number(t.number().unwrap()).kind).collect();
        assert_eq!(kinds, vec![NumberKind::Half, NumberKind::Uint, NumberKind::Int, NumberKind::Float]);
        assert_eq!(tables.number(tokens[1].number().unwrap()).value, 31.0);
        assert!(lexer.diagnostics().is_empty());
    }

    #[test]
    fn test_signed_overflow_warns() {
        let (tokens, _, lexer) = scan("x = 3000000000;");
        assert_eq!(tokens.len(), 4);
        assert_eq!(lexer.diagnostics().warnings().count(), 1);
        assert!(!lexer.failed());

        let (_, _, lexer) = scan("x = 3000000000u;");
        assert!(lexer.diagnostics().is_empty());
    }

    #[test]
    fn test_stops_at_first_unmatched_character() {
        let (tokens, _, lexer) = scan("a = 1;\nb = $ 2; @");
        assert!(lexer.failed());
        assert_eq!(tokens.len(), 6);
        let errors: Vec<_> = lexer.diagnostics().errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "tokenization failed at 2:5");
    }

    #[test]
    fn test_reserved_words_and_types() {
        let (tokens, _, _) = scan("uniform vec4 color; texture mixer");
        assert!(tokens[0].is_keyword(Keyword::Uniform));
        assert!(tokens[1].type_id().is_some());
        assert!(tokens[2].identifier().is_some());
        assert_eq!(tokens[4].builtin(), Some(Builtin::Texture));
        assert!(tokens[5].identifier().is_some());
    }

    #[test]
    fn test_positions_and_comments() {
        let (tokens, _, _) = scan("a // note\n/* x\ny */ b");
        assert_eq!(tokens.len(), 2);
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (3, 6));
    }

    #[test]
    fn test_struct_names_become_types() {
        let mut tables = SymbolTables::new();
        let mut lexer = Lexer::new(FileId::new(0));
        let mut tokens = lexer.scan("struct Light { vec3 dir; }; Light sun;", &mut tables);
        finish(&mut tokens, &mut tables);

        assert!(tokens[1].type_id().is_some());
        assert_eq!(tokens[8].type_id(), tokens[1].type_id());
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfTokens));
    }
}
