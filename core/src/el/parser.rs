//! Recursive-descent parser for `${...}` expressions.
//!
//! Precedence, lowest first:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | or | `\|\|` `or` |
//! | and | `&&` `and` |
//! | equality | `==` `!=` `eq` `ne` |
//! | relational | `<` `>` `<=` `>=` `lt` `gt` `le` `ge` |
//! | additive | `+` `-` |
//! | multiplicative | `*` `/` `%` `div` `mod` |
//! | unary | `!` `not` `-` `empty` |
//!
//! `and`/`or` chains parse flat, so long disjunctions do not count against
//! [`MAX_EXPRESSION_DEPTH`](crate::MAX_EXPRESSION_DEPTH).

use super::functions::Function;
use super::lexer::{syntax, tokenize, Tok, Token};
use crate::{EvalError, Value, EXPRESSION_CLOSE, EXPRESSION_OPEN, MAX_EXPRESSION_DEPTH, MAX_REGEX_PATTERN_LENGTH};
use regex::Regex;

/// Words with operator or literal meaning; never variable names.
pub(crate) const KEYWORDS: &[&str] = &[
    "true", "false", "null", "not", "and", "or", "eq", "ne", "lt", "gt", "le", "ge", "div", "mod",
    "empty",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }
}

/// Parsed expression.
#[derive(Debug)]
pub(crate) enum Expr {
    Literal(Value),
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Short-circuit conjunction, two or more terms.
    All(Vec<Expr>),
    /// Short-circuit disjunction, two or more terms.
    Any(Vec<Expr>),
    Call(Function, Vec<Expr>),
    /// `str:matches` with its pattern compiled at parse time.
    Matches(Box<Expr>, Regex),
}

type Level = &'static [(Tok, Option<&'static str>, BinaryOp)];

const EQUALITY: Level = &[
    (Tok::EqEq, Some("eq"), BinaryOp::Eq),
    (Tok::NotEq, Some("ne"), BinaryOp::Ne),
];

const RELATIONAL: Level = &[
    (Tok::Le, Some("le"), BinaryOp::Le),
    (Tok::Ge, Some("ge"), BinaryOp::Ge),
    (Tok::Lt, Some("lt"), BinaryOp::Lt),
    (Tok::Gt, Some("gt"), BinaryOp::Gt),
];

const ADDITIVE: Level = &[
    (Tok::Plus, None, BinaryOp::Add),
    (Tok::Minus, None, BinaryOp::Sub),
];

const MULTIPLICATIVE: Level = &[
    (Tok::Star, None, BinaryOp::Mul),
    (Tok::Slash, Some("div"), BinaryOp::Div),
    (Tok::Percent, Some("mod"), BinaryOp::Mod),
];

/// Parse a full `${...}` expression.
///
/// # Errors
///
/// [`EvalError::Syntax`] with a byte offset into `expression`, or the
/// resolution errors [`EvalError::UnknownFunction`], [`EvalError::Arity`],
/// [`EvalError::InvalidPattern`] and [`EvalError::DepthExceeded`].
pub(crate) fn parse(expression: &str) -> Result<Expr, EvalError> {
    let body = expression
        .strip_prefix(EXPRESSION_OPEN)
        .and_then(|rest| rest.strip_suffix(EXPRESSION_CLOSE))
        .ok_or_else(|| {
            syntax(
                0,
                format!("expression must be wrapped in {EXPRESSION_OPEN} ... {EXPRESSION_CLOSE}"),
            )
        })?;

    let mut parser = Parser {
        tokens: tokenize(body, EXPRESSION_OPEN.len())?,
        pos: 0,
        depth: 0,
        end: EXPRESSION_OPEN.len() + body.len(),
    };
    if parser.tokens.is_empty() {
        return Err(syntax(parser.end, "empty expression"));
    }

    let expr = parser.nested(Parser::or)?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.unexpected("expected an operator"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    /// Offset reported for "end of expression".
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Tok::Ident(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_op(&mut self, tok: &Tok, keyword: Option<&str>) -> bool {
        self.eat(tok) || keyword.is_some_and(|kw| self.eat_keyword(kw))
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), EvalError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {tok}")))
        }
    }

    fn unexpected(&self, wanted: &str) -> EvalError {
        match self.tokens.get(self.pos) {
            Some(token) => syntax(token.offset, format!("{wanted}, found {}", token.tok)),
            None => syntax(self.end, format!("{wanted}, found end of expression")),
        }
    }

    /// One level deeper in the tree.
    fn deepen(&mut self) -> Result<(), EvalError> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(EvalError::DepthExceeded {
                max: MAX_EXPRESSION_DEPTH,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn nested(&mut self, f: fn(&mut Self) -> Result<Expr, EvalError>) -> Result<Expr, EvalError> {
        let saved = self.depth;
        self.deepen()?;
        let expr = f(self)?;
        self.depth = saved;
        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        let first = self.and()?;
        let mut terms = Vec::new();
        while self.eat_op(&Tok::OrOr, Some("or")) {
            terms.push(self.and()?);
        }
        if terms.is_empty() {
            return Ok(first);
        }
        terms.insert(0, first);
        Ok(Expr::Any(terms))
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        let first = self.equality()?;
        let mut terms = Vec::new();
        while self.eat_op(&Tok::AndAnd, Some("and")) {
            terms.push(self.equality()?);
        }
        if terms.is_empty() {
            return Ok(first);
        }
        terms.insert(0, first);
        Ok(Expr::All(terms))
    }

    fn equality(&mut self) -> Result<Expr, EvalError> {
        self.binary(EQUALITY, Self::relational)
    }

    fn relational(&mut self) -> Result<Expr, EvalError> {
        self.binary(RELATIONAL, Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        self.binary(ADDITIVE, Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, EvalError> {
        self.binary(MULTIPLICATIVE, Self::unary)
    }

    /// Left-associative chain; each operator adds a level.
    fn binary(
        &mut self,
        level: Level,
        next: fn(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        let saved = self.depth;
        let mut lhs = next(self)?;
        while let Some(op) = self.eat_binary(level) {
            self.deepen()?;
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.depth = saved;
        Ok(lhs)
    }

    fn eat_binary(&mut self, level: Level) -> Option<BinaryOp> {
        level
            .iter()
            .find(|(tok, keyword, _)| self.eat_op(tok, *keyword))
            .map(|(_, _, op)| *op)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = if self.eat_op(&Tok::Bang, Some("not")) {
            UnaryOp::Not
        } else if self.eat(&Tok::Minus) {
            UnaryOp::Neg
        } else if self.eat_keyword("empty") {
            UnaryOp::Empty
        } else {
            return self.primary();
        };
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let Some(token) = self.advance() else {
            return Err(self.unexpected("expected a value"));
        };
        match token.tok {
            Tok::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Tok::Float(x) => Ok(Expr::Literal(Value::Float(x))),
            Tok::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Tok::LParen => {
                let inner = self.nested(Self::or)?;
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Tok::Ident(name) => self.identifier(name, token.offset),
            other => Err(syntax(
                token.offset,
                format!("expected a value, found {other}"),
            )),
        }
    }

    fn identifier(&mut self, name: String, offset: usize) -> Result<Expr, EvalError> {
        match name.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" => return Ok(Expr::Literal(Value::Null)),
            _ => {}
        }
        if self.eat(&Tok::Colon) {
            return self.call(&name, offset);
        }
        if KEYWORDS.contains(&name.as_str()) {
            return Err(syntax(offset, format!("unexpected keyword \"{name}\"")));
        }
        Ok(Expr::Variable(name))
    }

    fn call(&mut self, namespace: &str, offset: usize) -> Result<Expr, EvalError> {
        let name = match self.advance() {
            Some(Token {
                tok: Tok::Ident(name),
                ..
            }) => name,
            _ => {
                return Err(syntax(
                    offset,
                    format!("expected a function name after \"{namespace}:\""),
                ))
            }
        };
        let qualified = format!("{namespace}:{name}");
        let function =
            Function::resolve(&qualified).ok_or(EvalError::UnknownFunction { name: qualified })?;

        self.expect(&Tok::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&Tok::RParen) {
            loop {
                args.push(self.nested(Self::or)?);
                if self.eat(&Tok::RParen) {
                    break;
                }
                self.expect(&Tok::Comma)?;
            }
        }
        if args.len() != function.arity() {
            return Err(EvalError::Arity {
                name: function.name().to_owned(),
                expected: function.arity(),
                actual: args.len(),
            });
        }

        if function == Function::Matches {
            return matches_call(args, offset);
        }
        Ok(Expr::Call(function, args))
    }
}

fn matches_call(args: Vec<Expr>, offset: usize) -> Result<Expr, EvalError> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(subject), Some(Expr::Literal(Value::String(pattern)))) => {
            Ok(Expr::Matches(Box::new(subject), compile_pattern(&pattern)?))
        }
        _ => Err(syntax(offset, "str:matches pattern must be a string literal")),
    }
}

/// Compile a `str:matches` pattern. Rust `regex` syntax, linear-time matching.
fn compile_pattern(pattern: &str) -> Result<Regex, EvalError> {
    if pattern.len() > MAX_REGEX_PATTERN_LENGTH {
        return Err(EvalError::InvalidPattern {
            pattern: pattern.chars().take(32).collect::<String>() + "...",
            reason: format!(
                "pattern length is {}, but maximum allowed is {MAX_REGEX_PATTERN_LENGTH}",
                pattern.len()
            ),
        });
    }
    Regex::new(pattern).map_err(|e| EvalError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: e.to_string(),
    })
}
