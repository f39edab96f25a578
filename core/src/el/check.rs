//! Static type check used at validation time.
//!
//! Infers a coarse type for every node. Record-derived values are [`Ty::Any`]
//! and accepted wherever a concrete type is expected; their real type is only
//! known per record.

use super::functions::{Function, Param};
use super::parser::{BinaryOp, Expr, UnaryOp};
use crate::{Constants, EvalError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ty {
    Bool,
    Number,
    String,
    Null,
    Collection,
    Any,
}

impl Ty {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Int(_) | Value::Float(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::List(_) | Value::Map(_) => Self::Collection,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Null => "null",
            Self::Collection => "collection",
            Self::Any => "any",
        }
    }

    fn is(self, expected: Self) -> bool {
        self == expected || self == Self::Any
    }
}

/// Check that `expr` can produce a boolean.
pub(crate) fn check_boolean(expr: &Expr, constants: Option<&Constants>) -> Result<(), EvalError> {
    let ty = infer(expr, constants)?;
    if ty.is(Ty::Bool) {
        Ok(())
    } else {
        Err(EvalError::NotBoolean { kind: ty.name() })
    }
}

fn type_error(message: String) -> EvalError {
    EvalError::Type(message)
}

pub(crate) fn infer(expr: &Expr, constants: Option<&Constants>) -> Result<Ty, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(Ty::of(value)),
        Expr::Variable(name) => constants
            .and_then(|c| c.get(name))
            .map(Ty::of)
            .ok_or_else(|| EvalError::UnknownVariable { name: name.clone() }),
        Expr::Unary(op, operand) => {
            let ty = infer(operand, constants)?;
            match op {
                UnaryOp::Not if ty.is(Ty::Bool) => Ok(Ty::Bool),
                UnaryOp::Not => Err(type_error(format!("operator ! expects bool, got {}", ty.name()))),
                UnaryOp::Neg if ty.is(Ty::Number) => Ok(Ty::Number),
                UnaryOp::Neg => Err(type_error(format!("operator - expects a number, got {}", ty.name()))),
                UnaryOp::Empty => Ok(Ty::Bool),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let (l, r) = (infer(lhs, constants)?, infer(rhs, constants)?);
            infer_binary(*op, l, r)
        }
        Expr::All(terms) | Expr::Any(terms) => {
            let symbol = if matches!(expr, Expr::All(_)) { "&&" } else { "||" };
            for term in terms {
                let ty = infer(term, constants)?;
                if !ty.is(Ty::Bool) {
                    return Err(type_error(format!(
                        "operator {symbol} expects bool operands, got {}",
                        ty.name()
                    )));
                }
            }
            Ok(Ty::Bool)
        }
        Expr::Call(function, args) => {
            for (arg, param) in args.iter().zip(function.params()) {
                check_param(*function, *param, infer(arg, constants)?)?;
            }
            Ok(function.returns())
        }
        Expr::Matches(subject, _) => {
            check_param(Function::Matches, Param::Text, infer(subject, constants)?)?;
            Ok(Ty::Bool)
        }
    }
}

fn infer_binary(op: BinaryOp, l: Ty, r: Ty) -> Result<Ty, EvalError> {
    match op {
        BinaryOp::Eq | BinaryOp::Ne => Ok(Ty::Bool),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let comparable = l == Ty::Any
                || r == Ty::Any
                || (l == r && matches!(l, Ty::Number | Ty::String));
            if comparable {
                Ok(Ty::Bool)
            } else {
                Err(type_error(format!(
                    "cannot compare {} {} {}",
                    l.name(),
                    op.symbol(),
                    r.name()
                )))
            }
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            if l.is(Ty::Number) && r.is(Ty::Number) {
                Ok(Ty::Number)
            } else {
                Err(type_error(format!(
                    "operator {} expects numbers, got {} and {}",
                    op.symbol(),
                    l.name(),
                    r.name()
                )))
            }
        }
    }
}

fn check_param(function: Function, param: Param, ty: Ty) -> Result<(), EvalError> {
    let ok = match param {
        Param::Path => ty.is(Ty::String),
        Param::Text => ty != Ty::Collection,
        Param::Any => true,
    };
    if ok {
        Ok(())
    } else {
        Err(type_error(format!(
            "{function} does not accept a {} argument",
            ty.name()
        )))
    }
}
