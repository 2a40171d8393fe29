//! Token model produced by the lexer

use crate::tables::{IdentId, MacroId, NumberId, TypeId};

/// Reserved words of the dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Break,
    Const,
    Continue,
    Do,
    Else,
    For,
    Goto,
    If,
    Return,
    Struct,
    While,
    In,
    Out,
    Uniform,
    Buffer,
    Image,
    Shared,
    Global,
    Highp,
    Mediump,
    Lowp,
    // Only ever synthesized by the Metal backend
    Constant,
    Device,
    Level,
    Thread,
    Threadgroup,
}

impl Keyword {
    /// Words recognised in source text
    pub const SOURCE: [Keyword; 21] = [
        Keyword::Break,
        Keyword::Const,
        Keyword::Continue,
        Keyword::Do,
        Keyword::Else,
        Keyword::For,
        Keyword::Goto,
        Keyword::If,
        Keyword::Return,
        Keyword::Struct,
        Keyword::While,
        Keyword::In,
        Keyword::Out,
        Keyword::Uniform,
        Keyword::Buffer,
        Keyword::Image,
        Keyword::Shared,
        Keyword::Global,
        Keyword::Highp,
        Keyword::Mediump,
        Keyword::Lowp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Break => "break",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::Goto => "goto",
            Keyword::If => "if",
            Keyword::Return => "return",
            Keyword::Struct => "struct",
            Keyword::While => "while",
            Keyword::In => "in",
            Keyword::Out => "out",
            Keyword::Uniform => "uniform",
            Keyword::Buffer => "buffer",
            Keyword::Image => "image",
            Keyword::Shared => "shared",
            Keyword::Global => "global",
            Keyword::Highp => "highp",
            Keyword::Mediump => "mediump",
            Keyword::Lowp => "lowp",
            Keyword::Constant => "constant",
            Keyword::Device => "device",
            Keyword::Level => "level",
            Keyword::Thread => "thread",
            Keyword::Threadgroup => "threadgroup",
        }
    }

    pub fn from_source(text: &str) -> Option<Keyword> {
        Keyword::SOURCE.into_iter().find(|k| k.as_str() == text)
    }

    pub fn is_precision(self) -> bool {
        matches!(self, Keyword::Highp | Keyword::Mediump | Keyword::Lowp)
    }
}

/// Operators and punctuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    LessLessEqual,
    GreaterGreaterEqual,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    NotEqual,
    LessLess,
    GreaterGreater,
    OrOr,
    AndAnd,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,
    PlusPlus,
    MinusMinus,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Less,
    Greater,
    Equal,
    Dot,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Colon,
    Question,
    Bang,
}

/// Symbol spellings, longest first so the scanner prefers `<<=` over `<<`
pub const SYMBOLS: &[(&str, Symbol)] = &[
    ("<<=", Symbol::LessLessEqual),
    (">>=", Symbol::GreaterGreaterEqual),
    ("<=", Symbol::LessEqual),
    (">=", Symbol::GreaterEqual),
    ("==", Symbol::EqualEqual),
    ("!=", Symbol::NotEqual),
    ("<<", Symbol::LessLess),
    (">>", Symbol::GreaterGreater),
    ("||", Symbol::OrOr),
    ("&&", Symbol::AndAnd),
    ("+=", Symbol::PlusEqual),
    ("-=", Symbol::MinusEqual),
    ("*=", Symbol::StarEqual),
    ("/=", Symbol::SlashEqual),
    ("%=", Symbol::PercentEqual),
    ("&=", Symbol::AmpEqual),
    ("|=", Symbol::PipeEqual),
    ("^=", Symbol::CaretEqual),
    ("++", Symbol::PlusPlus),
    ("--", Symbol::MinusMinus),
    (";", Symbol::Semicolon),
    ("(", Symbol::LeftParen),
    (")", Symbol::RightParen),
    ("{", Symbol::LeftBrace),
    ("}", Symbol::RightBrace),
    ("[", Symbol::LeftBracket),
    ("]", Symbol::RightBracket),
    ("<", Symbol::Less),
    (">", Symbol::Greater),
    ("=", Symbol::Equal),
    (".", Symbol::Dot),
    (",", Symbol::Comma),
    ("+", Symbol::Plus),
    ("-", Symbol::Minus),
    ("*", Symbol::Star),
    ("/", Symbol::Slash),
    ("%", Symbol::Percent),
    ("&", Symbol::Amp),
    ("|", Symbol::Pipe),
    ("^", Symbol::Caret),
    ("~", Symbol::Tilde),
    (":", Symbol::Colon),
    ("?", Symbol::Question),
    ("!", Symbol::Bang),
];

impl Symbol {
    pub fn as_str(self) -> &'static str {
        SYMBOLS
            .iter()
            .find(|(_, s)| *s == self)
            .map(|(text, _)| *text)
            .unwrap_or("")
    }
}

/// Built-in functions whose spelling differs between backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Mix,
    Texture,
    TextureLod,
    Discard,
    Normalize,
    Pow,
    Fract,
    Barrier,
    MemoryBarrierShared,
    MemoryBarrier,
    // Produced by backend rewriting
    Mul,
    Sample,
    SampleLevel,
    DiscardFragment,
}

impl Builtin {
    pub fn from_source(text: &str) -> Option<Builtin> {
        Some(match text {
            "mix" => Builtin::Mix,
            "texture" => Builtin::Texture,
            "textureLod" => Builtin::TextureLod,
            "discard" => Builtin::Discard,
            "normalize" => Builtin::Normalize,
            "pow" => Builtin::Pow,
            "fract" => Builtin::Fract,
            "barrier" => Builtin::Barrier,
            "memoryBarrierShared" => Builtin::MemoryBarrierShared,
            "memoryBarrier" => Builtin::MemoryBarrier,
            _ => return None,
        })
    }

    /// Dialect spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Builtin::Mix => "mix",
            Builtin::Texture => "texture",
            Builtin::TextureLod => "textureLod",
            Builtin::Discard => "discard",
            Builtin::Normalize => "normalize",
            Builtin::Pow => "pow",
            Builtin::Fract => "fract",
            Builtin::Barrier => "barrier",
            Builtin::MemoryBarrierShared => "memoryBarrierShared",
            Builtin::MemoryBarrier => "memoryBarrier",
            Builtin::Mul => "mul",
            Builtin::Sample => "sample",
            Builtin::SampleLevel => "sampleLevel",
            Builtin::DiscardFragment => "discard_fragment",
        }
    }

    pub fn is_sampling(self) -> bool {
        matches!(
            self,
            Builtin::Texture | Builtin::TextureLod | Builtin::Sample | Builtin::SampleLevel
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Reserved(Keyword),
    Identifier(IdentId),
    Number(NumberId),
    Macro(MacroId),
    Type(TypeId),
    Symbol(Symbol),
    Builtin(Builtin),
    EndOfTokens,
}

/// One classified token; line 0 marks tokens made up by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, line: u32, column: u32) -> Self {
        Self { kind, line, column }
    }

    pub fn synthetic(kind: TokenKind) -> Self {
        Self { kind, line: 0, column: 0 }
    }

    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Reserved(keyword)
    }

    pub fn identifier(&self) -> Option<IdentId> {
        match self.kind {
            TokenKind::Identifier(id) => Some(id),
            _ => None,
        }
    }

    pub fn type_id(&self) -> Option<TypeId> {
        match self.kind {
            TokenKind::Type(id) => Some(id),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<NumberId> {
        match self.kind {
            TokenKind::Number(id) => Some(id),
            _ => None,
        }
    }

    pub fn builtin(&self) -> Option<Builtin> {
        match self.kind {
            TokenKind::Builtin(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_are_longest_first_per_prefix() {
        for (i, (text, _)) in SYMBOLS.iter().enumerate() {
            for (later, _) in &SYMBOLS[i + 1..] {
                assert!(
                    !(later.len() > text.len() && later.starts_with(text)),
                    "{} shadows {}",
                    text,
                    later
                );
            }
        }
    }

    #[test]
    fn test_metal_words_are_not_source_keywords() {
        assert_eq!(Keyword::from_source("uniform"), Some(Keyword::Uniform));
        assert_eq!(Keyword::from_source("device"), None);
        assert_eq!(Keyword::from_source("level"), None);
    }
}
