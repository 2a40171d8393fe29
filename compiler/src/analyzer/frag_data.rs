//! Multi-render-target writes
//!
//! `gl_FragData[N] = ...` becomes an assignment to the plain output
//! `_Frag_DataN`. Only indices written this way keep their output
//! declaration.

use parser::{Symbol, Token, TokenKind};

use super::declarations::FRAG_DATA_PREFIX;
use super::ShaderUnit;

const FRAG_DATA: &str = "gl_FragData";

/// Tokens removed per rewritten write: `[`, `N` and `]`
const INDEX_TOKENS: usize = 3;

pub fn rewrite(unit: &mut ShaderUnit) {
    let Some(frag_data) = unit.lookup(FRAG_DATA) else {
        return;
    };

    let mut i = 0;
    while i + 4 < unit.tokens.len() {
        let Some(index) = indexed_write(unit, i, frag_data) else {
            i += 1;
            continue;
        };
        let name = unit.intern(&format!("{}{}", FRAG_DATA_PREFIX, index));
        let original = unit.tokens[i];
        unit.tokens[i] = Token::new(TokenKind::Identifier(name), original.line, original.column);
        unit.tokens.drain(i + 1..i + 1 + INDEX_TOKENS);
        unit.frag_data_indices.insert(index);
        i += 1;
    }
}

/// Index of a `gl_FragData [ N ] =` sequence starting at `i`
fn indexed_write(unit: &ShaderUnit, i: usize, frag_data: parser::IdentId) -> Option<u32> {
    let tokens = &unit.tokens;
    if tokens[i].identifier() != Some(frag_data)
        || !tokens[i + 1].is_symbol(Symbol::LeftBracket)
        || !tokens[i + 3].is_symbol(Symbol::RightBracket)
        || !tokens[i + 4].is_symbol(Symbol::Equal)
    {
        return None;
    }
    let literal = unit.tables.number(tokens[i + 2].number()?);
    literal
        .as_int()
        .and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::unit;
    use super::*;
    use diagnostics::ShaderStage;
    use parser::token_text;

    #[test]
    fn test_indexed_write_becomes_identifier() {
        let mut unit = unit(ShaderStage::Fragment, "gl_FragData[2] = color;\n");
        rewrite(&mut unit);
        let text: Vec<String> = unit
            .tokens
            .iter()
            .map(|t| token_text(t, &unit.tables))
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(text, vec!["_Frag_Data2", "=", "color", ";"]);
        assert_eq!(unit.frag_data_indices.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_reads_are_left_alone() {
        let mut unit = unit(ShaderStage::Fragment, "vec4 c = gl_FragData[1];\n");
        let before = unit.tokens.len();
        rewrite(&mut unit);
        assert_eq!(unit.tokens.len(), before);
        assert!(unit.frag_data_indices.is_empty());
    }
}
