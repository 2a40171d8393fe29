//! Backend source generation
//!
//! Each backend family emits its own declarations and then re-serializes the
//! function ranges token by token. The re-serialization loop is shared; the
//! backends differ only in their [`TokenStyle`].

pub mod glsl;
pub mod hlsl;
pub mod msl;

use std::ops::Range;

use parser::{Builtin, IdentId, Keyword, NumberKind, Precision, Symbol, Token, TokenKind, TypeId};

use crate::analyzer::{frag_data_index, precision_of, Function, ShaderUnit, StorageQualifier};
use crate::context::{BackendFamily, CompileContext};
use crate::error::CompileError;

/// Rewrite the token stream for the target before function discovery
pub fn rewrite(unit: &mut ShaderUnit, ctx: &CompileContext) {
    match ctx.family() {
        BackendFamily::Glsl => {}
        BackendFamily::Hlsl => hlsl::rewrite(unit),
        BackendFamily::Msl => msl::rewrite(unit),
    }
}

/// Emit the complete stage source for the context's target
pub fn generate(unit: &mut ShaderUnit, ctx: &CompileContext) -> Result<String, CompileError> {
    match ctx.family() {
        BackendFamily::Glsl => Ok(glsl::emit(unit, ctx)),
        BackendFamily::Hlsl => hlsl::emit(unit, ctx),
        BackendFamily::Msl => {
            msl::thread_buffers(unit);
            msl::emit(unit, ctx)
        }
    }
}

/// Per-backend spelling of tokens during re-serialization
pub(crate) trait TokenStyle {
    fn family(&self) -> BackendFamily;

    /// `precision` comes from the variable or from a preceding precision keyword
    fn type_name(&self, unit: &ShaderUnit, ty: TypeId, precision: Option<Precision>) -> String;

    fn builtin_name(&self, builtin: Builtin) -> &'static str;

    fn identifier(&self, unit: &ShaderUnit, id: IdentId, _in_entry: bool) -> String {
        unit.name(id).to_string()
    }

    /// `None` drops the keyword
    fn keyword(&self, _unit: &ShaderUnit, keyword: Keyword, _in_entry: bool) -> Option<String> {
        Some(keyword.as_str().to_string())
    }

    /// Extra parameter declared after a sampler parameter in a helper header
    fn sampler_parameter(&self, _unit: &ShaderUnit, _id: IdentId) -> Option<String> {
        None
    }

    /// Extra argument passed after a sampler handed to a helper
    fn sampler_argument(&self, _unit: &ShaderUnit, _id: IdentId) -> Option<String> {
        None
    }
}

/// `[N]`, `[]` or nothing
pub(crate) fn array_suffix(size: i32) -> String {
    match size {
        0 => String::new(),
        n if n < 0 => "[]".to_string(),
        n => format!("[{}]", n),
    }
}

/// Name and type spelling of a classified variable
pub(crate) fn declared<S: TokenStyle>(style: &S, unit: &ShaderUnit, id: IdentId) -> (String, String) {
    let variable = unit.variable(id);
    let ty = variable
        .ty
        .map(|ty| style.type_name(unit, ty, Some(variable.precision)))
        .unwrap_or_default();
    (ty, unit.name(id).to_string())
}

pub(crate) fn storage(unit: &ShaderUnit, id: IdentId) -> StorageQualifier {
    unit.variable(id).storage
}

pub(crate) const POSITION: &str = "gl_Position";

/// Outputs other than `gl_Position` with their location; `_Frag_DataN` keeps `N`
pub(crate) fn output_slots(unit: &ShaderUnit) -> Vec<(IdentId, u32)> {
    let mut next = 0u32;
    unit.outputs
        .iter()
        .filter(|id| unit.name(**id) != POSITION)
        .map(|id| {
            let slot = frag_data_index(unit.name(*id)).unwrap_or_else(|| {
                next += 1;
                next - 1
            });
            (*id, slot)
        })
        .collect()
}

/// Top-level macro lines, without the GLSL-only ones on other backends
pub(crate) fn emit_macros(out: &mut String, unit: &ShaderUnit, family: BackendFamily) {
    let mut emitted = false;
    for id in &unit.macros {
        let text = unit.tables.macro_text(*id);
        let glsl_only = text.starts_with("#version") || text.starts_with("#extension");
        if glsl_only && family != BackendFamily::Glsl {
            continue;
        }
        out.push_str(text);
        out.push('\n');
        emitted = true;
    }
    if emitted {
        out.push('\n');
    }
}

pub(crate) fn emit_workgroup_defines(out: &mut String, ctx: &CompileContext) {
    let size = ctx.workgroup_size;
    out.push_str(&format!("#define WORKGROUP_SIZE_X {}\n", size.x));
    out.push_str(&format!("#define WORKGROUP_SIZE_Y {}\n", size.y));
    out.push_str(&format!("#define WORKGROUP_SIZE_Z {}\n\n", size.z));
}

/// Re-serialize `range`; `header_args` marks a helper's parameter tokens
pub(crate) fn print_tokens<S: TokenStyle>(
    out: &mut String,
    unit: &ShaderUnit,
    style: &S,
    range: Range<usize>,
    in_entry: bool,
    header_args: Option<Range<usize>>,
) {
    let mut pending_precision = None;

    for k in range {
        let token = unit.tokens[k];
        match token.kind {
            TokenKind::Reserved(keyword) => {
                if let Some(precision) = precision_of(keyword) {
                    pending_precision = Some(precision);
                }
                if let Some(text) = style.keyword(unit, keyword, in_entry) {
                    out.push_str(&text);
                    out.push(' ');
                }
            }
            TokenKind::Type(ty) => {
                out.push_str(&style.type_name(unit, ty, pending_precision.take()));
                out.push(' ');
            }
            TokenKind::Identifier(id) => {
                out.push_str(&style.identifier(unit, id, in_entry));
                out.push(' ');
                if unit.is_sampler_variable(id) {
                    let extra = if header_args.as_ref().is_some_and(|args| args.contains(&k)) {
                        style.sampler_parameter(unit, id)
                    } else if !followed_by_sampling(unit, k) {
                        style.sampler_argument(unit, id)
                    } else {
                        None
                    };
                    if let Some(extra) = extra {
                        out.push_str(&extra);
                    }
                }
            }
            TokenKind::Number(id) => {
                let literal = unit.tables.number(id);
                out.push_str(&literal.text);
                match literal.kind {
                    NumberKind::Uint => out.push('u'),
                    NumberKind::Half if style.family() == BackendFamily::Msl => out.push('h'),
                    _ => {}
                }
                out.push(' ');
            }
            TokenKind::Macro(id) => {
                out.push('\n');
                out.push_str(unit.tables.macro_text(id));
                out.push_str("\n\t");
            }
            TokenKind::Symbol(symbol) => {
                out.push_str(symbol.as_str());
                if matches!(symbol, Symbol::Semicolon | Symbol::LeftBrace | Symbol::RightBrace) {
                    out.push_str("\n\t");
                } else {
                    out.push(' ');
                }
            }
            TokenKind::Builtin(builtin) => {
                out.push_str(style.builtin_name(builtin));
                out.push(' ');
            }
            TokenKind::EndOfTokens => {}
        }
    }
}

/// `name . sample (` style call produced by the texture rewrite
fn followed_by_sampling(unit: &ShaderUnit, k: usize) -> bool {
    unit.tokens
        .get(k + 2)
        .and_then(|t| t.builtin())
        .is_some_and(Builtin::is_sampling)
}

/// A helper function from its return type to its closing brace
pub(crate) fn print_function<S: TokenStyle>(out: &mut String, unit: &ShaderUnit, style: &S, function: &Function) {
    print_tokens(
        out,
        unit,
        style,
        function.start..function.close_brace(),
        false,
        Some(function.args()),
    );
    out.push_str("}\n\n");
}

/// Only the body of the entry point; the caller writes its header
pub(crate) fn print_entry_body<S: TokenStyle>(out: &mut String, unit: &ShaderUnit, style: &S, function: &Function) {
    print_tokens(out, unit, style, function.body(), true, None);
}

/// Helpers and entry point in order of appearance
pub(crate) fn emit_functions<S: TokenStyle>(
    out: &mut String,
    unit: &ShaderUnit,
    style: &S,
    mut entry: impl FnMut(&mut String, &Function),
) {
    for function in &unit.functions {
        if function.is_entry {
            entry(out, function);
        } else {
            print_function(out, unit, style, function);
        }
    }
}

pub(crate) fn emit_structs<S: TokenStyle>(out: &mut String, unit: &ShaderUnit, style: &S) {
    for definition in &unit.structs {
        if definition.malformed {
            out.push_str("#error // PARSER: unable to parse struct\n\n");
            continue;
        }
        out.push_str(&format!("struct {}\n{{\n", unit.type_name(definition.name)));
        for member in &definition.members {
            let ty = style.type_name(unit, member.ty, member.precision);
            out.push_str(&format!(
                "\t{} {}{};\n",
                ty,
                unit.name(member.name),
                array_suffix(member.array_count as i32)
            ));
        }
        out.push_str("};\n\n");
    }
}

/// Name of the sampler object paired with a combined sampler `name`
pub(crate) fn sampler_name(name: &str) -> String {
    format!("{}_sampler", name)
}

/// Turn `texture ( s , ...` into `s . <method> ( s_sampler , ...`
///
/// `method` maps the sampling builtin to its replacement or `None` to leave
/// the call alone. Returns the index of each rewritten call's `(` together
/// with the builtin it replaced, in stream order.
pub(crate) fn split_sampler_calls(
    unit: &mut ShaderUnit,
    method: impl Fn(Builtin) -> Option<Builtin>,
) -> Vec<(usize, Builtin)> {
    let mut rewritten = Vec::new();
    let mut i = 0;
    while i + 3 < unit.tokens.len() {
        let token = unit.tokens[i];
        let replacement = token.builtin().and_then(|b| method(b).map(|m| (b, m)));
        let sampler = unit.tokens[i + 2].identifier();
        let (Some((original, replacement)), Some(sampler)) = (replacement, sampler) else {
            i += 1;
            continue;
        };
        if !unit.tokens[i + 1].is_symbol(Symbol::LeftParen) || !unit.tokens[i + 3].is_symbol(Symbol::Comma) {
            i += 1;
            continue;
        }

        let paired = sampler_name(unit.name(sampler));
        let paired = unit.intern(&paired);
        let at = |kind: TokenKind| Token::new(kind, token.line, token.column);
        let call = [
            at(TokenKind::Identifier(sampler)),
            at(TokenKind::Symbol(Symbol::Dot)),
            at(TokenKind::Builtin(replacement)),
            at(TokenKind::Symbol(Symbol::LeftParen)),
            at(TokenKind::Identifier(paired)),
            at(TokenKind::Symbol(Symbol::Comma)),
        ];
        unit.tokens.splice(i..i + 4, call);
        rewritten.push((i + 3, original));
        i += call.len();
    }
    rewritten
}

/// Drop the `pattern` symbols following each `builtin`, and the builtin itself if asked
pub(crate) fn remove_after(unit: &mut ShaderUnit, builtin: Builtin, pattern: &[Symbol], include_builtin: bool) {
    let mut i = 0;
    while i < unit.tokens.len() {
        let matches = unit.tokens[i].builtin() == Some(builtin)
            && pattern
                .iter()
                .enumerate()
                .all(|(offset, symbol)| unit.tokens.get(i + 1 + offset).is_some_and(|t| t.is_symbol(*symbol)));
        if !matches {
            i += 1;
            continue;
        }
        if include_builtin {
            unit.tokens.drain(i..i + 1 + pattern.len());
        } else {
            unit.tokens.drain(i + 1..i + 1 + pattern.len());
            i += 1;
        }
    }
}
