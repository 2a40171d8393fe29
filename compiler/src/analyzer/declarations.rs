//! Type inference and storage classification of top-level declarations

use diagnostics::shader::ShaderDiagnostics;
use parser::{IdentId, Precision, Symbol, SymbolTables, Token, TokenKind, TypeId};

use super::{precision_of, ShaderUnit, StorageQualifier};

/// Name prefix of the fragment stage's multi-target outputs
pub(crate) const FRAG_DATA_PREFIX: &str = "_Frag_Data";

/// Give every identifier that directly follows a type token that type
pub(crate) fn infer_types(unit: &mut ShaderUnit) {
    for i in 1..unit.tokens.len() {
        let (Some(id), Some(ty)) = (unit.tokens[i].identifier(), unit.tokens[i - 1].type_id()) else {
            continue;
        };
        let precision = i.checked_sub(2).and_then(|p| match unit.tokens[p].kind {
            TokenKind::Reserved(keyword) => precision_of(keyword),
            _ => None,
        });
        let variable = unit.variable_mut(id);
        variable.ty = Some(ty);
        if let Some(precision) = precision {
            variable.precision = precision;
        }
    }
}

#[derive(Debug)]
struct Declaration {
    precision: Option<Precision>,
    ty: TypeId,
    name: IdentId,
    array_size: i32,
}

#[derive(Debug)]
enum Rejection {
    /// Not a `qualifier [precision] type name ...;` sequence
    Pattern(Option<IdentId>),
    /// `name[]` outside a buffer
    Unbounded(IdentId),
}

fn kind_at(tokens: &[Token], index: usize) -> TokenKind {
    tokens.get(index).map_or(TokenKind::EndOfTokens, |t| t.kind)
}

fn parse_declaration(
    tokens: &[Token],
    tables: &SymbolTables,
    start: usize,
    storage: StorageQualifier,
) -> Result<Declaration, Rejection> {
    let mut cursor = start + 1;

    let mut precision = None;
    if let TokenKind::Reserved(keyword) = kind_at(tokens, cursor) {
        if let Some(p) = precision_of(keyword) {
            precision = Some(p);
            cursor += 1;
        }
    }

    let TokenKind::Type(ty) = kind_at(tokens, cursor) else {
        return Err(Rejection::Pattern(None));
    };
    let TokenKind::Identifier(name) = kind_at(tokens, cursor + 1) else {
        return Err(Rejection::Pattern(None));
    };
    cursor += 2;

    let semicolon = Symbol::Semicolon;
    let array_size = match kind_at(tokens, cursor) {
        TokenKind::Symbol(Symbol::Semicolon) => 0,
        TokenKind::Symbol(Symbol::LeftBracket) => {
            match (kind_at(tokens, cursor + 1), kind_at(tokens, cursor + 2), kind_at(tokens, cursor + 3)) {
                (TokenKind::Symbol(Symbol::RightBracket), TokenKind::Symbol(s), _) if s == semicolon => {
                    if storage != StorageQualifier::Buffer {
                        return Err(Rejection::Unbounded(name));
                    }
                    -1
                }
                (TokenKind::Number(id), TokenKind::Symbol(Symbol::RightBracket), TokenKind::Symbol(s))
                    if s == semicolon =>
                {
                    match tables.number(id).as_int() {
                        Some(n) if n > 0 && n <= i32::MAX as i64 => n as i32,
                        _ => return Err(Rejection::Pattern(Some(name))),
                    }
                }
                _ => return Err(Rejection::Pattern(Some(name))),
            }
        }
        _ => return Err(Rejection::Pattern(Some(name))),
    };

    Ok(Declaration { precision, ty, name, array_size })
}

/// Record every storage-qualified declaration at file scope
pub(crate) fn classify(unit: &mut ShaderUnit) {
    let mut brace_depth = 0i32;
    let mut paren_depth = 0i32;

    for i in 0..unit.tokens.len() {
        let token = unit.tokens[i];
        match token.kind {
            TokenKind::Symbol(Symbol::LeftBrace) => brace_depth += 1,
            TokenKind::Symbol(Symbol::RightBrace) => brace_depth -= 1,
            TokenKind::Symbol(Symbol::LeftParen) => paren_depth += 1,
            TokenKind::Symbol(Symbol::RightParen) => paren_depth -= 1,
            TokenKind::Macro(id) if brace_depth == 0 => unit.macros.push(id),
            _ => {}
        }
        if brace_depth != 0 || paren_depth != 0 {
            continue;
        }
        let TokenKind::Reserved(keyword) = token.kind else {
            continue;
        };
        let Some(storage) = StorageQualifier::from_keyword(keyword) else {
            continue;
        };

        match parse_declaration(&unit.tokens, &unit.tables, i, storage) {
            Ok(declaration) => record(unit, storage, declaration),
            Err(rejection) => {
                let (name, reason) = match rejection {
                    Rejection::Pattern(name) => (name, "expected `type name;` or `type name[N];`"),
                    Rejection::Unbounded(name) => (Some(name), "only buffers may be unbounded arrays"),
                };
                let name = name.map_or_else(|| keyword.as_str().to_string(), |id| unit.name(id).to_string());
                log::debug!("skipping declaration of '{}': {}", name, reason);
                let span = unit.span_at(i);
                unit.diagnostics
                    .push(ShaderDiagnostics::skipped_declaration(span, &name, reason));
            }
        }
    }
}

fn record(unit: &mut ShaderUnit, storage: StorageQualifier, declaration: Declaration) {
    let Declaration { precision, ty, name, array_size } = declaration;

    let storage = if storage == StorageQualifier::Uniform && unit.tables.ty(ty).is_sampler() {
        StorageQualifier::Sampler
    } else {
        storage
    };

    if storage == StorageQualifier::Out && unit.stage == diagnostics::ShaderStage::Fragment {
        if let Some(index) = unit.name(name).strip_prefix(FRAG_DATA_PREFIX) {
            let used = index
                .parse::<u32>()
                .is_ok_and(|n| unit.frag_data_indices.contains(&n));
            if !used {
                log::trace!("dropping unused fragment output {}", unit.name(name));
                return;
            }
        }
    }

    if unit.variable(name).storage != StorageQualifier::Unset {
        log::debug!("'{}' is declared more than once, keeping the first", unit.name(name));
        return;
    }

    let force_highp = unit.force_highp;
    let variable = unit.variable_mut(name);
    variable.ty = Some(ty);
    variable.storage = storage;
    variable.array_size = array_size;
    variable.precision = if force_highp {
        Precision::High
    } else {
        precision.unwrap_or(Precision::High)
    };

    if let Some(list) = unit.storage_list_mut(storage) {
        list.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::analyzed;
    use super::*;
    use diagnostics::ShaderStage;

    #[test]
    fn test_precision_is_recorded() {
        let unit = analyzed(ShaderStage::Fragment, "uniform mediump vec4 tint;\nin lowp vec2 uv;\n");
        assert_eq!(unit.variable(unit.uniforms[0]).precision, Precision::Medium);
        assert_eq!(unit.variable(unit.inputs[0]).precision, Precision::Low);
    }

    #[test]
    fn test_force_highp_overrides_precision() {
        let mut unit = super::super::test_support::unit(ShaderStage::Fragment, "uniform mediump vec4 tint;\n");
        unit.force_highp = true;
        super::super::analyze(&mut unit);
        assert_eq!(unit.variable(unit.uniforms[0]).precision, Precision::High);
    }

    #[test]
    fn test_declarations_inside_functions_are_ignored() {
        let unit = analyzed(
            ShaderStage::Vertex,
            "in vec3 pos;\nvoid main() { out_pos = vec4(pos, 1.0); }\nvoid f(in float x) { }\n",
        );
        assert_eq!(unit.inputs.len(), 1);
        assert_eq!(unit.name(unit.inputs[0]), "pos");
    }

    #[test]
    fn test_local_types_are_inferred() {
        let unit = analyzed(ShaderStage::Vertex, "void main() { mat4 m; vec4 p; }\n");
        let ty = unit.type_of(unit.lookup("m").unwrap()).unwrap();
        assert!(ty.is_matrix());
        assert_eq!(unit.variable(unit.lookup("p").unwrap()).storage, StorageQualifier::Unset);
    }
}
