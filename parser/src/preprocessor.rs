//! Shader preprocessor
//!
//! Runs before the lexer. It removes comments, expands object-like
//! `#define`s and resolves conditional blocks (`#if`, `#ifdef`, `#ifndef`,
//! `#elif`, `#else`, `#endif`). Directive lines it consumes are replaced by
//! blank lines so every surviving line keeps its original line number.
//!
//! Directives the preprocessor does not own (`#version`, `#extension`,
//! `#pragma`, function-like `#define`) are left in place for the lexer to
//! turn into macro tokens.

use std::collections::BTreeMap;

/// Line that switches a compilation to forced high precision
pub const FORCE_HIGHP: &str = "force_highp;";

const MAX_EXPANSION_DEPTH: usize = 16;

/// Configuration for a preprocessor run
#[derive(Debug, Clone, Default)]
pub struct PreprocessorConfig {
    /// Defines visible before the first line, e.g. from the command line
    pub defines: BTreeMap<String, String>,
}

impl PreprocessorConfig {
    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub text: String,
    /// A `force_highp;` line was seen in an active region
    pub force_highp: bool,
}

#[derive(Debug, Clone, Copy)]
struct CondFrame {
    parent_active: bool,
    active: bool,
    taken: bool,
}

/// Preprocess shader source text
///
/// # Example
/// ```
/// use parser::preprocessor::{preprocess, PreprocessorConfig};
///
/// let source = "#define SIZE 4\n#ifdef FAST\nfloat a[2];\n#else\nfloat a[SIZE];\n#endif\n";
/// let out = preprocess(source, &PreprocessorConfig::default());
/// assert_eq!(out.text, "\n\n\n\nfloat a[4];\n\n");
/// ```
pub fn preprocess(source: &str, config: &PreprocessorConfig) -> Preprocessed {
    let stripped = strip_comments(source);
    let mut defines = config.defines.clone();
    let mut stack: Vec<CondFrame> = Vec::new();
    let mut force_highp = false;
    let mut result = String::with_capacity(stripped.len());

    for line in stripped.split('\n') {
        let active = stack.last().map(|f| f.active).unwrap_or(true);
        let trimmed = line.trim_start();

        if let Some(directive) = trimmed.strip_prefix('#') {
            let directive = directive.trim_start();
            let (name, rest) = split_word(directive);
            match name {
                "define" if active => {
                    let (macro_name, body) = split_word(rest);
                    if body.starts_with('(') || macro_name.is_empty() {
                        // function-like macros are left to the target compiler
                        result.push_str(line);
                    } else {
                        defines.insert(macro_name.to_string(), body.trim().to_string());
                    }
                }
                "undef" if active => {
                    defines.remove(split_word(rest).0);
                }
                "ifdef" | "ifndef" | "if" => {
                    let condition = active
                        && match name {
                            "ifdef" => defines.contains_key(split_word(rest).0),
                            "ifndef" => !defines.contains_key(split_word(rest).0),
                            _ => evaluate_condition(rest, &defines),
                        };
                    stack.push(CondFrame { parent_active: active, active: condition, taken: condition });
                }
                "elif" => {
                    if let Some(frame) = stack.last_mut() {
                        if frame.taken {
                            frame.active = false;
                        } else {
                            let condition = frame.parent_active && evaluate_condition(rest, &defines);
                            frame.active = condition;
                            frame.taken = condition;
                        }
                    }
                }
                "else" => {
                    if let Some(frame) = stack.last_mut() {
                        frame.active = frame.parent_active && !frame.taken;
                        frame.taken = true;
                    }
                }
                "endif" => {
                    stack.pop();
                }
                "define" | "undef" => {}
                _ if active => result.push_str(line),
                _ => {}
            }
        } else if active {
            if trimmed.trim_end() == FORCE_HIGHP {
                force_highp = true;
            } else {
                result.push_str(&expand(line, &defines, 0));
            }
        }
        result.push('\n');
    }

    if !stack.is_empty() {
        log::warn!("{} conditional block(s) still open at the end of the source", stack.len());
    }
    log::trace!("preprocessed with {} define(s) in scope", defines.len());

    // split() yields one piece more than there are newlines
    result.pop();
    Preprocessed { text: result, force_highp }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    (&text[..end], &text[end..])
}

/// Remove `//` and `/* */` comments, keeping the newlines inside them
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Replace whole identifiers that name an object-like define
fn expand(line: &str, defines: &BTreeMap<String, String>, depth: usize) -> String {
    if defines.is_empty() || depth > MAX_EXPANSION_DEPTH {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find(|c: char| c.is_ascii_alphabetic() || c == '_') {
        // identifiers never start inside a number such as 1e5 or 0x1F
        let prefix = &rest[..start];
        let glued = prefix.chars().last().map(|c| c.is_ascii_alphanumeric()).unwrap_or(false);
        out.push_str(prefix);
        let tail = &rest[start..];
        let end = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(tail.len());
        let word = &tail[..end];
        match defines.get(word) {
            Some(value) if !glued => out.push_str(&expand(value, defines, depth + 1)),
            _ => out.push_str(word),
        }
        rest = &tail[end..];
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone, PartialEq)]
enum CondToken {
    Number(i64),
    Ident(String),
    Defined,
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize_condition(condition: &str) -> Vec<CondToken> {
    const OPS: [&str; 10] = ["&&", "||", "==", "!=", "<=", ">=", "<", ">", "!", "-"];
    let mut tokens = Vec::new();
    let mut rest = condition.trim();
    while !rest.is_empty() {
        let c = rest.chars().next().unwrap_or(' ');
        if c.is_whitespace() {
            rest = rest.trim_start();
            continue;
        }
        if c == '(' || c == ')' {
            tokens.push(if c == '(' { CondToken::LParen } else { CondToken::RParen });
            rest = &rest[1..];
            continue;
        }
        if let Some(op) = OPS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(CondToken::Op(op));
            rest = &rest[op.len()..];
            continue;
        }
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len())
            .max(c.len_utf8());
        let word = &rest[..end];
        rest = &rest[end..];
        if c.is_ascii_digit() {
            tokens.push(CondToken::Number(parse_int(word)));
        } else if word == "defined" {
            tokens.push(CondToken::Defined);
        } else if c.is_ascii_alphabetic() || c == '_' {
            tokens.push(CondToken::Ident(word.to_string()));
        }
    }
    tokens
}

fn parse_int(word: &str) -> i64 {
    let word = word.trim_end_matches(['u', 'U']);
    if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).unwrap_or(0)
    } else {
        let digits: String = word.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().unwrap_or(0)
    }
}

/// Evaluate an `#if`/`#elif` expression; undefined names are 0
fn evaluate_condition(condition: &str, defines: &BTreeMap<String, String>) -> bool {
    let tokens = tokenize_condition(condition);
    let mut evaluator = CondEvaluator { tokens: &tokens, pos: 0, defines, depth: 0 };
    evaluator.or() != 0
}

struct CondEvaluator<'a> {
    tokens: &'a [CondToken],
    pos: usize,
    defines: &'a BTreeMap<String, String>,
    depth: usize,
}

impl CondEvaluator<'_> {
    fn peek_op(&self, op: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(CondToken::Op(o)) if *o == op)
    }

    fn or(&mut self) -> i64 {
        let mut value = self.and();
        while self.peek_op("||") {
            self.pos += 1;
            let rhs = self.and();
            value = ((value != 0) || (rhs != 0)) as i64;
        }
        value
    }

    fn and(&mut self) -> i64 {
        let mut value = self.comparison();
        while self.peek_op("&&") {
            self.pos += 1;
            let rhs = self.comparison();
            value = ((value != 0) && (rhs != 0)) as i64;
        }
        value
    }

    fn comparison(&mut self) -> i64 {
        let lhs = self.unary();
        for op in ["==", "!=", "<=", ">=", "<", ">"] {
            if self.peek_op(op) {
                self.pos += 1;
                let rhs = self.unary();
                return match op {
                    "==" => (lhs == rhs) as i64,
                    "!=" => (lhs != rhs) as i64,
                    "<=" => (lhs <= rhs) as i64,
                    ">=" => (lhs >= rhs) as i64,
                    "<" => (lhs < rhs) as i64,
                    _ => (lhs > rhs) as i64,
                };
            }
        }
        lhs
    }

    fn unary(&mut self) -> i64 {
        if self.peek_op("!") {
            self.pos += 1;
            return (self.unary() == 0) as i64;
        }
        if self.peek_op("-") {
            self.pos += 1;
            return -self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> i64 {
        let Some(token) = self.tokens.get(self.pos).cloned() else { return 0 };
        self.pos += 1;
        match token {
            CondToken::Number(n) => n,
            CondToken::LParen => {
                let value = self.or();
                if let Some(CondToken::RParen) = self.tokens.get(self.pos) {
                    self.pos += 1;
                }
                value
            }
            CondToken::Defined => {
                let parenthesized = matches!(self.tokens.get(self.pos), Some(CondToken::LParen));
                if parenthesized {
                    self.pos += 1;
                }
                let value = match self.tokens.get(self.pos) {
                    Some(CondToken::Ident(name)) => self.defines.contains_key(name) as i64,
                    _ => 0,
                };
                self.pos += 1;
                if parenthesized && matches!(self.tokens.get(self.pos), Some(CondToken::RParen)) {
                    self.pos += 1;
                }
                value
            }
            CondToken::Ident(name) => match self.defines.get(&name) {
                Some(value) if self.depth < MAX_EXPANSION_DEPTH => {
                    let tokens = tokenize_condition(value);
                    let mut nested = CondEvaluator {
                        tokens: &tokens,
                        pos: 0,
                        defines: self.defines,
                        depth: self.depth + 1,
                    };
                    nested.or()
                }
                _ => 0,
            },
            CondToken::Op(_) | CondToken::RParen => 0,
        }
    }
}
