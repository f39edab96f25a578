//! Tokenizer for expression bodies.

use crate::EvalError;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Colon,
    Comma,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "number {i}"),
            Self::Float(x) => write!(f, "number {x}"),
            Self::Str(s) => write!(f, "string '{s}'"),
            Self::Ident(name) => write!(f, "\"{name}\""),
            Self::Colon => f.write_str("':'"),
            Self::Comma => f.write_str("','"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Star => f.write_str("'*'"),
            Self::Slash => f.write_str("'/'"),
            Self::Percent => f.write_str("'%'"),
            Self::Bang => f.write_str("'!'"),
            Self::AndAnd => f.write_str("'&&'"),
            Self::OrOr => f.write_str("'||'"),
            Self::EqEq => f.write_str("'=='"),
            Self::NotEq => f.write_str("'!='"),
            Self::Lt => f.write_str("'<'"),
            Self::Gt => f.write_str("'>'"),
            Self::Le => f.write_str("'<='"),
            Self::Ge => f.write_str("'>='"),
        }
    }
}

/// A token and its byte offset in the full expression text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) tok: Tok,
    pub(crate) offset: usize,
}

type Chars<'s> = Peekable<CharIndices<'s>>;

pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> EvalError {
    EvalError::Syntax {
        offset,
        message: message.into(),
    }
}

/// Split `body` into tokens. Offsets are shifted by `base`.
pub(crate) fn tokenize(body: &str, base: usize) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let tok = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' => number(body, &mut chars, start, base)?,
            '\'' | '"' => {
                chars.next();
                string(&mut chars, c, start + base)?
            }
            c if is_ident_start(c) => Tok::Ident(identifier(body, &mut chars, start).to_owned()),
            _ => {
                chars.next();
                symbol(&mut chars, c, start + base)?
            }
        };
        tokens.push(Token {
            tok,
            offset: start + base,
        });
    }
    Ok(tokens)
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn identifier<'s>(body: &'s str, chars: &mut Chars<'_>, start: usize) -> &'s str {
    let mut end = start;
    while let Some(&(i, c)) = chars.peek() {
        if !is_ident_continue(c) {
            break;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    &body[start..end]
}

fn number(body: &str, chars: &mut Chars<'_>, start: usize, base: usize) -> Result<Tok, EvalError> {
    let mut end = start;
    let mut is_float = false;
    while let Some(&(i, c)) = chars.peek() {
        match c {
            '0'..='9' => {}
            '.' if !is_float => is_float = true,
            _ => break,
        }
        end = i + 1;
        chars.next();
    }

    let text = &body[start..end];
    let invalid = |e: &dyn fmt::Display| syntax(start + base, format!("invalid number {text}: {e}"));
    if is_float {
        text.parse().map(Tok::Float).map_err(|e| invalid(&e))
    } else {
        text.parse().map(Tok::Int).map_err(|e| invalid(&e))
    }
}

/// String literal after its opening quote. `\\`, `\'` and `\"` are escapes;
/// any other backslash is kept, so regex classes like `\d` pass through.
fn string(chars: &mut Chars<'_>, quote: char, offset: usize) -> Result<Tok, EvalError> {
    let mut out = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, esc @ ('\\' | '\'' | '"'))) => out.push(esc),
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            c if c == quote => return Ok(Tok::Str(out)),
            c => out.push(c),
        }
    }
    Err(syntax(offset, "unterminated string literal"))
}

fn eat(chars: &mut Chars<'_>, expected: char) -> bool {
    if chars.peek().map(|&(_, c)| c) == Some(expected) {
        chars.next();
        true
    } else {
        false
    }
}

fn symbol(chars: &mut Chars<'_>, c: char, offset: usize) -> Result<Tok, EvalError> {
    let tok = match c {
        '(' => Tok::LParen,
        ')' => Tok::RParen,
        ',' => Tok::Comma,
        ':' => Tok::Colon,
        '+' => Tok::Plus,
        '-' => Tok::Minus,
        '*' => Tok::Star,
        '/' => Tok::Slash,
        '%' => Tok::Percent,
        '!' if eat(chars, '=') => Tok::NotEq,
        '!' => Tok::Bang,
        '<' if eat(chars, '=') => Tok::Le,
        '<' => Tok::Lt,
        '>' if eat(chars, '=') => Tok::Ge,
        '>' => Tok::Gt,
        '=' if eat(chars, '=') => Tok::EqEq,
        '&' if eat(chars, '&') => Tok::AndAnd,
        '|' if eat(chars, '|') => Tok::OrOr,
        other => return Err(syntax(offset, format!("unexpected character '{other}'"))),
    };
    Ok(tok)
}
