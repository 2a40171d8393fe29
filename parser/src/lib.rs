//! Front end of the shading-language translator
//!
//! Preprocessing, the token model, per-compilation symbol tables, the closed
//! type system and the nom-based lexer.

pub mod lexer;
pub mod preprocessor;
pub mod tables;
pub mod token;
pub mod types;

pub use diagnostics::*;

pub use lexer::{finish, token_text, Lexer};
pub use preprocessor::{preprocess, Preprocessed, PreprocessorConfig};
pub use tables::{IdentId, MacroId, NumberId, NumberKind, NumberLiteral, SymbolTables, TypeEntry, TypeId};
pub use token::{Builtin, Keyword, Symbol, Token, TokenKind};
pub use types::{BaseType, Precision, Type, TypeClass};

/// Tokens of one source text together with the tables they index
#[derive(Debug, Clone)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub tables: SymbolTables,
    pub diagnostics: Diagnostics,
}

impl LexOutput {
    pub fn failed(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Tokenize a complete source text, ending the stream with `EndOfTokens`
pub fn tokenize(source: &str, file_id: FileId) -> LexOutput {
    let mut tables = SymbolTables::new();
    let mut lexer = Lexer::new(file_id);
    let mut tokens = lexer.scan(source, &mut tables);
    finish(&mut tokens, &mut tables);
    LexOutput { tokens, tables, diagnostics: lexer.into_diagnostics() }
}
