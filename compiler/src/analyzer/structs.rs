//! User struct definitions

use diagnostics::shader::ShaderDiagnostics;
use parser::{IdentId, Keyword, Precision, Symbol, TokenKind, TypeId};

use super::{precision_of, ShaderUnit};

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub precision: Option<Precision>,
    pub ty: TypeId,
    pub name: IdentId,
    /// 0 for a scalar member
    pub array_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    pub name: TypeId,
    pub members: Vec<StructMember>,
    /// Body could not be parsed; emitted as an `#error` placeholder
    pub malformed: bool,
}

/// Parse `struct Name { members };` starting at the `struct` keyword
fn parse_struct(unit: &ShaderUnit, start: usize) -> Result<(Struct, usize), Option<TypeId>> {
    let tokens = &unit.tokens;
    let kind = |i: usize| tokens.get(i).map_or(TokenKind::EndOfTokens, |t| t.kind);

    let TokenKind::Type(name) = kind(start + 1) else {
        return Err(None);
    };
    if kind(start + 2) != TokenKind::Symbol(Symbol::LeftBrace) {
        return Err(Some(name));
    }

    let mut members = Vec::new();
    let mut i = start + 3;
    loop {
        match kind(i) {
            TokenKind::Symbol(Symbol::RightBrace) => break,
            TokenKind::EndOfTokens => return Err(Some(name)),
            _ => {}
        }

        let mut precision = None;
        if let TokenKind::Reserved(keyword) = kind(i) {
            precision = precision_of(keyword);
            if precision.is_none() {
                return Err(Some(name));
            }
            i += 1;
        }
        let (TokenKind::Type(ty), TokenKind::Identifier(member)) = (kind(i), kind(i + 1)) else {
            return Err(Some(name));
        };
        i += 2;

        let array_count = match kind(i) {
            TokenKind::Symbol(Symbol::Semicolon) => {
                i += 1;
                0
            }
            TokenKind::Symbol(Symbol::LeftBracket) => {
                let count = match (kind(i + 1), kind(i + 2), kind(i + 3)) {
                    (
                        TokenKind::Number(id),
                        TokenKind::Symbol(Symbol::RightBracket),
                        TokenKind::Symbol(Symbol::Semicolon),
                    ) => unit.tables.number(id).as_int(),
                    _ => None,
                };
                match count {
                    Some(n) if n > 0 && n <= u32::MAX as i64 => {
                        i += 4;
                        n as u32
                    }
                    _ => return Err(Some(name)),
                }
            }
            _ => return Err(Some(name)),
        };

        members.push(StructMember { precision, ty, name: member, array_count });
    }

    Ok((Struct { name, members, malformed: false }, i + 1))
}

/// Record every struct definition, tolerating malformed bodies
pub(crate) fn build(unit: &mut ShaderUnit) {
    let mut i = 0;
    while i < unit.tokens.len() {
        if !unit.tokens[i].is_keyword(Keyword::Struct) {
            i += 1;
            continue;
        }
        match parse_struct(unit, i) {
            Ok((definition, next)) => {
                unit.structs.push(definition);
                i = next;
            }
            Err(name) => {
                let label = name.map(|ty| unit.type_name(ty).to_string());
                let span = unit.span_at(i);
                unit.diagnostics
                    .push(ShaderDiagnostics::malformed_struct(span, label.as_deref()));
                if let Some(name) = name {
                    unit.structs.push(Struct { name, members: Vec::new(), malformed: true });
                }
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::analyzed;
    use diagnostics::ShaderStage;

    #[test]
    fn test_struct_members() {
        let unit = analyzed(
            ShaderStage::Fragment,
            "struct Light { vec3 position; mediump vec4 color; float weights[4]; };\n",
        );
        assert_eq!(unit.structs.len(), 1);
        let light = &unit.structs[0];
        assert!(!light.malformed);
        assert_eq!(unit.type_name(light.name), "Light");
        assert_eq!(light.members.len(), 3);
        assert_eq!(light.members[2].array_count, 4);
        assert_eq!(unit.name(light.members[0].name), "position");
    }

    #[test]
    fn test_malformed_struct_yields_placeholder() {
        let unit = analyzed(ShaderStage::Fragment, "struct Broken { vec3 position = 1.0; };\n");
        assert_eq!(unit.structs.len(), 1);
        assert!(unit.structs[0].malformed);
        assert!(unit.structs[0].members.is_empty());
        assert_eq!(unit.diagnostics.warnings().count(), 1);
    }
}
