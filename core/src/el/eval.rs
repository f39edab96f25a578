//! Tree-walking evaluation of parsed expressions against a bound context.

use super::functions::Function;
use super::parser::{BinaryOp, Expr, UnaryOp};
use super::ElContext;
use crate::{EvalError, RecordData, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

pub(crate) fn evaluate<R: RecordData + ?Sized>(
    expr: &Expr,
    ctx: &ElContext<'_, R>,
) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => ctx
            .constants
            .and_then(|c| c.get(name))
            .cloned()
            .ok_or_else(|| EvalError::UnknownVariable { name: name.clone() }),
        Expr::Unary(op, operand) => unary(*op, evaluate(operand, ctx)?),
        Expr::Binary(op, lhs, rhs) => {
            let l = evaluate(lhs, ctx)?;
            let r = evaluate(rhs, ctx)?;
            binary(*op, &l, &r)
        }
        Expr::All(terms) => {
            for term in terms {
                if !truth(&evaluate(term, ctx)?, "&&")? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::Any(terms) => {
            for term in terms {
                if truth(&evaluate(term, ctx)?, "||")? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expr::Call(function, args) => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call(*function, &args, ctx)
        }
        Expr::Matches(subject, regex) => {
            let subject = evaluate(subject, ctx)?;
            Ok(Value::Bool(regex.is_match(&text(Function::Matches, &subject)?)))
        }
    }
}

fn truth(value: &Value, op: &str) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| {
        EvalError::Type(format!("operator {op} expects bool operands, got {}", value.kind()))
    })
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::Type("integer overflow in negation".into())),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Empty, value) => Ok(Value::Bool(value.is_empty())),
        (UnaryOp::Not, value) => Err(EvalError::Type(format!(
            "operator ! expects bool, got {}",
            value.kind()
        ))),
        (UnaryOp::Neg, value) => Err(EvalError::Type(format!(
            "operator - expects a number, got {}",
            value.kind()
        ))),
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(l, r))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(l, r))),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let Some(ordering) = compare(op, l, r)? else {
                // NaN is unordered
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Le => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, l, r)
        }
    }
}

/// Numbers compare by value across `Int` and `Float`; otherwise kinds must match.
fn equals(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => a == b,
        _ if l.is_number() && r.is_number() => l.as_f64() == r.as_f64(),
        _ => l == r,
    }
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<Option<Ordering>, EvalError> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        _ => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
            _ => Err(EvalError::Type(format!(
                "cannot compare {} {} {}",
                l.kind(),
                op.symbol(),
                r.kind()
            ))),
        },
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    let overflow = || EvalError::Type(format!("integer overflow in {}", op.symbol()));
    let by_zero = || EvalError::Type("division by zero".into());

    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        let (a, b) = (*a, *b);
        return match op {
            BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Mod if b == 0 => Err(by_zero()),
            BinaryOp::Mod => a.checked_rem(b).map(Value::Int).ok_or_else(overflow),
            // `/` always divides as floating point
            _ => float_arithmetic(op, l, r),
        };
    }
    float_arithmetic(op, l, r)
}

fn float_arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
        return Err(EvalError::Type(format!(
            "operator {} expects numbers, got {} and {}",
            op.symbol(),
            l.kind(),
            r.kind()
        )));
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Mod if b == 0.0 => {
            return Err(EvalError::Type("division by zero".into()))
        }
        BinaryOp::Div => a / b,
        _ => a % b,
    };
    Ok(Value::Float(result))
}

/// Text view of a value: null is empty, scalars use their display form.
fn text(function: Function, value: &Value) -> Result<Cow<'_, str>, EvalError> {
    match value {
        Value::String(s) => Ok(Cow::Borrowed(s)),
        Value::Null => Ok(Cow::Borrowed("")),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => Ok(Cow::Owned(value.to_string())),
        Value::List(_) | Value::Map(_) => Err(EvalError::Type(format!(
            "{function} does not accept a {} argument",
            value.kind()
        ))),
    }
}

fn path(function: Function, value: &Value) -> Result<&str, EvalError> {
    value.as_str().ok_or_else(|| {
        EvalError::Type(format!(
            "{function} expects a string path, got {}",
            value.kind()
        ))
    })
}

fn record<'c, R: ?Sized>(ctx: &ElContext<'c, R>) -> Result<&'c R, EvalError> {
    ctx.record.ok_or(EvalError::NoRecordBound)
}

fn call<R: RecordData + ?Sized>(
    function: Function,
    args: &[Value],
    ctx: &ElContext<'_, R>,
) -> Result<Value, EvalError> {
    let value = match (function, args) {
        (Function::Value, [p]) => {
            let p = path(function, p)?;
            record(ctx)?
                .field(p)
                .ok_or_else(|| EvalError::MissingField { path: p.to_owned() })?
        }
        (Function::Exists, [p]) => Value::Bool(record(ctx)?.field(path(function, p)?).is_some()),
        (Function::ValueOrDefault, [p, default]) => record(ctx)?
            .field(path(function, p)?)
            .unwrap_or_else(|| default.clone()),
        (Function::Attribute, [name]) => record(ctx)?
            .attribute(path(function, name)?)
            .map_or(Value::Null, Value::from),
        (Function::Id, []) => Value::from(record(ctx)?.source_id()),
        (Function::Length, [s]) => {
            let count = text(function, s)?.chars().count();
            Value::Int(i64::try_from(count).unwrap_or(i64::MAX))
        }
        (Function::ToUpper, [s]) => Value::String(text(function, s)?.to_uppercase()),
        (Function::ToLower, [s]) => Value::String(text(function, s)?.to_lowercase()),
        (Function::Trim, [s]) => Value::String(text(function, s)?.trim().to_owned()),
        (Function::Contains, [s, part]) => {
            Value::Bool(text(function, s)?.contains(text(function, part)?.as_ref()))
        }
        (Function::StartsWith, [s, prefix]) => {
            Value::Bool(text(function, s)?.starts_with(text(function, prefix)?.as_ref()))
        }
        (Function::EndsWith, [s, suffix]) => {
            Value::Bool(text(function, s)?.ends_with(text(function, suffix)?.as_ref()))
        }
        _ => {
            return Err(EvalError::Arity {
                name: function.name().to_owned(),
                expected: function.arity(),
                actual: args.len(),
            })
        }
    };
    Ok(value)
}
