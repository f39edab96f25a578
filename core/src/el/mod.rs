//! EL — The built-in `${...}` expression language
//!
//! A small, side-effect-free boolean expression language over a record and
//! named constants. It is one implementation of [`ExpressionEvaluator`]; the
//! router does not depend on it.
//!
//! # Syntax
//!
//! ```text
//! ${record:value('/order/total') > LIMIT && str:startsWith(record:attribute('topic'), 'eu-')}
//! ```
//!
//! - Literals: `true`, `false`, `null`, integers, floats, `'single'` or `"double"` strings
//! - Identifiers resolve to bound constants
//! - Operators: see the precedence table in the parser module
//! - Functions: [`Function::ALL`]
//!
//! # Semantics
//!
//! - Numbers compare by value across integers and floats; strings compare
//!   lexicographically; ordering any other mix is a [`EvalError::Type`] error.
//! - `==` between unrelated kinds is `false`, never an error.
//! - `&&` and `||` short-circuit, and both operands must be booleans.
//! - `/` always divides as floating point; `%` keeps integers integral.
//! - `record:value` fails with [`EvalError::MissingField`] when the field does
//!   not exist; use `record:exists` or `record:valueOrDefault` to guard.
//!
//! Parsed programs are cached by expression text, so each distinct predicate
//! is parsed once per evaluator.

mod check;
mod eval;
mod functions;
mod lexer;
mod parser;

pub use functions::Function;

use crate::{Constants, EvalError, ExpressionEvaluator, Record, RecordData, Value};
use parser::{Expr, KEYWORDS};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Function namespaces; reserved as constant names.
pub const NAMESPACES: &[&str] = &["record", "str"];

/// Upper bound on cached programs per evaluator.
const MAX_CACHED_PROGRAMS: usize = 1024;

/// The built-in EL evaluator.
///
/// Cheap to share: one evaluator serves every routing thread. Parsed programs
/// are cached behind a `RwLock`.
///
/// # Example
///
/// ```
/// use lanes::el::ElEvaluator;
/// use lanes::{Constants, ExpressionEvaluator, Record, RecordData, Value};
///
/// #[derive(Debug)]
/// struct Order { id: String, total: i64 }
///
/// impl Record for Order {
///     fn source_id(&self) -> &str { &self.id }
/// }
///
/// impl RecordData for Order {
///     fn field(&self, path: &str) -> Option<Value> {
///         (path == "/total").then(|| Value::Int(self.total))
///     }
/// }
///
/// let evaluator = ElEvaluator::new();
/// let constants: Constants = [("LIMIT", 100)].into_iter().collect();
/// let order = Order { id: "o-1".into(), total: 250 };
///
/// let mut ctx = ExpressionEvaluator::<Order>::new_context(&evaluator);
/// evaluator.bind_constants(&mut ctx, &constants);
/// evaluator.bind_record(&mut ctx, &order);
/// assert_eq!(evaluator.evaluate_boolean(&ctx, "${record:value('/total') > LIMIT}"), Ok(true));
/// ```
#[derive(Default)]
pub struct ElEvaluator {
    cache: RwLock<HashMap<String, Arc<Expr>>>,
}

impl ElEvaluator {
    /// Create an evaluator with an empty program cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached programs.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.read().map_or(0, |cache| cache.len())
    }

    /// Parse `expression`, or fetch it from the cache.
    ///
    /// A poisoned cache lock only disables caching.
    fn program(&self, expression: &str) -> Result<Arc<Expr>, EvalError> {
        if let Ok(cache) = self.cache.read() {
            if let Some(program) = cache.get(expression) {
                return Ok(Arc::clone(program));
            }
        }

        let program = Arc::new(parser::parse(expression)?);
        if let Ok(mut cache) = self.cache.write() {
            if cache.len() < MAX_CACHED_PROGRAMS {
                cache.insert(expression.to_owned(), Arc::clone(&program));
            }
        }
        Ok(program)
    }
}

impl fmt::Debug for ElEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElEvaluator")
            .field("cached", &self.cached())
            .finish()
    }
}

/// Binding state for one routing pass: constants plus at most one record.
pub struct ElContext<'a, R: ?Sized> {
    constants: Option<&'a Constants>,
    record: Option<&'a R>,
}

impl<'a, R: ?Sized> ElContext<'a, R> {
    /// The bound record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&'a R> {
        self.record
    }

    /// The bound constants, if any.
    #[must_use]
    pub fn constants(&self) -> Option<&'a Constants> {
        self.constants
    }
}

impl<R: Record + ?Sized> fmt::Debug for ElContext<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElContext")
            .field("constants", &self.constants.map(Constants::len))
            .field("record", &self.record.map(Record::source_id))
            .finish()
    }
}

impl<R: RecordData + ?Sized> ExpressionEvaluator<R> for ElEvaluator {
    type Context<'a>
        = ElContext<'a, R>
    where
        Self: 'a,
        R: 'a;

    fn new_context<'a>(&'a self) -> ElContext<'a, R>
    where
        R: 'a,
    {
        ElContext {
            constants: None,
            record: None,
        }
    }

    fn bind_constants<'a>(&'a self, ctx: &mut ElContext<'a, R>, constants: &'a Constants)
    where
        R: 'a,
    {
        ctx.constants = Some(constants);
    }

    fn bind_record<'a>(&'a self, ctx: &mut ElContext<'a, R>, record: &'a R) {
        ctx.record = Some(record);
    }

    fn evaluate_boolean<'a>(
        &'a self,
        ctx: &ElContext<'a, R>,
        expression: &str,
    ) -> Result<bool, EvalError>
    where
        R: 'a,
    {
        let program = self.program(expression)?;
        let value = eval::evaluate(&program, ctx)?;
        value
            .as_bool()
            .ok_or(EvalError::NotBoolean { kind: value.kind() })
    }

    fn static_check_boolean<'a>(
        &'a self,
        ctx: &ElContext<'a, R>,
        expression: &str,
    ) -> Result<(), EvalError>
    where
        R: 'a,
    {
        let program = self.program(expression)?;
        check::check_boolean(&program, ctx.constants)
    }

    fn check_constant(&self, name: &str, value: &Value) -> Result<(), EvalError> {
        let _ = value;
        check_constant_name(name)
    }
}

/// A constant name must be an identifier that is neither a keyword nor a
/// function namespace.
fn check_constant_name(name: &str) -> Result<(), EvalError> {
    let mut chars = name.char_indices();
    match chars.next() {
        None => return Err(lexer::syntax(0, "constant name is empty")),
        Some((_, c)) if !lexer::is_ident_start(c) => {
            return Err(lexer::syntax(
                0,
                format!("constant name \"{name}\" must start with a letter or '_'"),
            ))
        }
        Some(_) => {}
    }
    if let Some((offset, c)) = chars.find(|&(_, c)| !lexer::is_ident_continue(c)) {
        return Err(lexer::syntax(
            offset,
            format!("constant name \"{name}\" contains '{c}'"),
        ));
    }
    if KEYWORDS.contains(&name) || NAMESPACES.contains(&name) {
        return Err(lexer::syntax(
            0,
            format!("constant name \"{name}\" is a reserved word"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Default)]
    struct Doc {
        id: String,
        fields: BTreeMap<String, Value>,
        attributes: BTreeMap<String, String>,
    }

    impl Record for Doc {
        fn source_id(&self) -> &str {
            &self.id
        }
    }

    impl RecordData for Doc {
        fn field(&self, path: &str) -> Option<Value> {
            self.fields.get(path).cloned()
        }

        fn attribute(&self, name: &str) -> Option<&str> {
            self.attributes.get(name).map(String::as_str)
        }
    }

    fn doc() -> Doc {
        Doc {
            id: "doc-7".into(),
            fields: [
                ("/n".to_owned(), Value::Int(12)),
                ("/price".to_owned(), Value::Float(9.5)),
                ("/name".to_owned(), Value::from("  Widget ")),
                ("/tags".to_owned(), Value::List(vec![])),
                ("/nothing".to_owned(), Value::Null),
            ]
            .into_iter()
            .collect(),
            attributes: [("topic".to_owned(), "eu-orders".to_owned())]
                .into_iter()
                .collect(),
        }
    }

    fn eval(expr: &str) -> Result<bool, EvalError> {
        let evaluator = ElEvaluator::new();
        let constants: Constants = [("LIMIT", Value::Int(10)), ("ON", Value::Bool(true))]
            .into_iter()
            .collect();
        let record = doc();
        let mut ctx = ExpressionEvaluator::<Doc>::new_context(&evaluator);
        evaluator.bind_constants(&mut ctx, &constants);
        evaluator.bind_record(&mut ctx, &record);
        evaluator.evaluate_boolean(&ctx, expr)
    }

    #[test]
    fn test_true_expressions() {
        for expr in [
            "${true}",
            "${ON}",
            "${record:value('/n') > LIMIT}",
            "${record:value('/n') == 12.0}",
            "${record:value('/price') < 10}",
            "${record:value('/n') % 5 == 2}",
            "${record:value('/n') / 8 == 1.5}",
            "${record:exists('/nothing') && record:value('/nothing') == null}",
            "${!record:exists('/missing')}",
            "${record:valueOrDefault('/missing', 3) == 3}",
            "${empty record:value('/tags')}",
            "${str:trim(record:value('/name')) eq 'Widget'}",
            "${str:toUpper('ab') == 'AB' and str:toLower('AB') == 'ab'}",
            "${str:length(record:value('/name')) == 9}",
            "${str:startsWith(record:attribute('topic'), 'eu-')}",
            "${str:endsWith(record:attribute('topic'), 'orders')}",
            "${str:contains(record:id(), '-7')}",
            "${record:attribute('absent') == null}",
            r"${str:matches(record:id(), '^doc-\d+$')}",
            "${'a' < 'b'}",
            "${1 == '1' || true}",
            "${-record:value('/n') lt 0}",
        ] {
            assert_eq!(eval(expr), Ok(true), "{expr}");
        }
    }

    #[test]
    fn test_false_expressions() {
        for expr in [
            "${false}",
            "${1 == '1'}",
            "${record:value('/n') < LIMIT}",
            "${not ON}",
            "${str:matches('abc', '^b')}",
            "${empty record:value('/name')}",
        ] {
            assert_eq!(eval(expr), Ok(false), "{expr}");
        }
    }

    #[test]
    fn test_short_circuit_skips_errors() {
        assert_eq!(eval("${false && record:value('/missing') > 1}"), Ok(false));
        assert_eq!(eval("${true || record:value('/missing') > 1}"), Ok(true));
    }

    #[test]
    fn test_runtime_errors() {
        assert_eq!(
            eval("${record:value('/x') > 5}"),
            Err(EvalError::MissingField { path: "/x".into() })
        );
        assert_eq!(
            eval("${record:value('/n')}"),
            Err(EvalError::NotBoolean { kind: "int" })
        );
        assert!(matches!(
            eval("${record:value('/name') > 1}"),
            Err(EvalError::Type(_))
        ));
        assert!(matches!(
            eval("${record:value('/n') && true}"),
            Err(EvalError::Type(_))
        ));
        assert!(matches!(eval("${UNSET}"), Err(EvalError::UnknownVariable { .. })));
        assert!(matches!(eval("${1 +}"), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_no_record_bound() {
        let evaluator = ElEvaluator::new();
        let ctx = ExpressionEvaluator::<Doc>::new_context(&evaluator);
        assert_eq!(
            evaluator.evaluate_boolean(&ctx, "${record:exists('/n')}"),
            Err(EvalError::NoRecordBound)
        );
    }

    #[test]
    fn test_rebinding_replaces_record() {
        let evaluator = ElEvaluator::new();
        let first = doc();
        let second = Doc {
            id: "other".into(),
            ..Doc::default()
        };
        let mut ctx = ExpressionEvaluator::<Doc>::new_context(&evaluator);
        evaluator.bind_record(&mut ctx, &first);
        assert_eq!(evaluator.evaluate_boolean(&ctx, "${record:exists('/n')}"), Ok(true));
        evaluator.bind_record(&mut ctx, &second);
        assert_eq!(evaluator.evaluate_boolean(&ctx, "${record:exists('/n')}"), Ok(false));
        assert_eq!(ctx.record().map(Record::source_id), Some("other"));
    }

    #[test]
    fn test_static_check_ignores_missing_fields() {
        let evaluator = ElEvaluator::new();
        let empty = Doc::default();
        let constants = Constants::new();
        let mut ctx = ExpressionEvaluator::<Doc>::new_context(&evaluator);
        evaluator.bind_constants(&mut ctx, &constants);
        evaluator.bind_record(&mut ctx, &empty);
        assert_eq!(
            evaluator.static_check_boolean(&ctx, "${record:value('/x') > 5}"),
            Ok(())
        );
        assert_eq!(
            evaluator.static_check_boolean(&ctx, "${1 + 2}"),
            Err(EvalError::NotBoolean { kind: "number" })
        );
    }

    #[test]
    fn test_programs_are_cached() {
        let evaluator = ElEvaluator::new();
        let record = doc();
        let mut ctx = ExpressionEvaluator::<Doc>::new_context(&evaluator);
        evaluator.bind_record(&mut ctx, &record);
        for _ in 0..3 {
            assert_eq!(evaluator.evaluate_boolean(&ctx, "${record:exists('/n')}"), Ok(true));
        }
        assert_eq!(evaluator.cached(), 1);
        assert!(evaluator.evaluate_boolean(&ctx, "${(}").is_err());
        assert_eq!(evaluator.cached(), 1);
    }

    #[test]
    fn test_check_constant_names() {
        let evaluator = ElEvaluator::new();
        let check = |name: &str| {
            ExpressionEvaluator::<Doc>::check_constant(&evaluator, name, &Value::Int(1))
        };
        assert_eq!(check("LIMIT"), Ok(()));
        assert_eq!(check("_max_2"), Ok(()));
        for bad in ["", "1bad", "has-dash", "not", "empty", "record", "str", "true"] {
            assert!(
                matches!(check(bad), Err(EvalError::Syntax { .. })),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn test_evaluator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ElEvaluator>();
    }
}
