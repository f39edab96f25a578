//! `ExpressionEvaluator` — The seam between routing and any expression language
//!
//! The router never interprets predicates itself. It binds constants and a
//! record into an evaluator-owned context and asks for a boolean. Any
//! expression language can sit behind this trait; [`ElEvaluator`](crate::el::ElEvaluator)
//! is the built-in one.
//!
//! # Context lifecycle
//!
//! ```text
//! new_context() → bind_constants() → { bind_record() → evaluate_boolean()* }*
//! ```
//!
//! A context is mutable binding state. One context holds one record at a time
//! and must not be shared between concurrent routing passes; each thread
//! creates its own. Rebinding a record must replace every trace of the
//! previous one.

use crate::{Constants, EvalError, Value};

/// Evaluates boolean predicates against records of type `R`.
///
/// # Thread Safety
///
/// The evaluator itself is shared (`Send + Sync`) across all routing passes;
/// only [`Context`](Self::Context) values are per-pass.
///
/// # Example
///
/// ```ignore
/// use lanes::{Constants, EvalError, ExpressionEvaluator, Record};
///
/// #[derive(Debug)]
/// struct Msg { id: String, urgent: bool }
/// impl Record for Msg {
///     fn source_id(&self) -> &str { &self.id }
/// }
///
/// /// Understands exactly two predicates.
/// struct UrgentFlag;
///
/// impl ExpressionEvaluator<Msg> for UrgentFlag {
///     type Context<'a> = Option<&'a Msg>;
///
///     fn new_context<'a>(&'a self) -> Self::Context<'a> { None }
///     fn bind_constants<'a>(&'a self, _: &mut Self::Context<'a>, _: &'a Constants) {}
///     fn bind_record<'a>(&'a self, ctx: &mut Self::Context<'a>, record: &'a Msg) {
///         *ctx = Some(record);
///     }
///     fn evaluate_boolean<'a>(&'a self, ctx: &Self::Context<'a>, expr: &str) -> Result<bool, EvalError> {
///         let msg = ctx.ok_or(EvalError::NoRecordBound)?;
///         match expr {
///             "${urgent}" => Ok(msg.urgent),
///             "${!urgent}" => Ok(!msg.urgent),
///             other => Err(EvalError::Custom(format!("unsupported: {other}"))),
///         }
///     }
///     fn static_check_boolean<'a>(&'a self, _: &Self::Context<'a>, expr: &str) -> Result<(), EvalError> {
///         matches!(expr, "${urgent}" | "${!urgent}")
///             .then_some(())
///             .ok_or_else(|| EvalError::Custom(format!("unsupported: {expr}")))
///     }
/// }
///
/// let ev = UrgentFlag;
/// let msg = Msg { id: "m1".into(), urgent: true };
/// let mut ctx = ev.new_context();
/// ev.bind_record(&mut ctx, &msg);
/// assert_eq!(ev.evaluate_boolean(&ctx, "${urgent}"), Ok(true));
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot evaluate predicates over `{R}`",
    label = "missing `ExpressionEvaluator<{R}>` implementation",
    note = "the built-in `lanes::el::ElEvaluator` works for any record implementing `RecordData`"
)]
pub trait ExpressionEvaluator<R: ?Sized>: Send + Sync {
    /// Per-pass binding state: constants plus at most one record.
    type Context<'a>
    where
        Self: 'a,
        R: 'a;

    /// Create a context with nothing bound.
    fn new_context<'a>(&'a self) -> Self::Context<'a>
    where
        R: 'a;

    /// Bind the resolved constants as named variables.
    fn bind_constants<'a>(&'a self, ctx: &mut Self::Context<'a>, constants: &'a Constants)
    where
        R: 'a;

    /// Bind `record`, replacing any previously bound record.
    fn bind_record<'a>(&'a self, ctx: &mut Self::Context<'a>, record: &'a R);

    /// Evaluate `expression` against the bound context.
    ///
    /// # Errors
    ///
    /// Any evaluator-level failure, including a non-boolean result and
    /// evaluator-enforced timeouts.
    fn evaluate_boolean<'a>(
        &'a self,
        ctx: &Self::Context<'a>,
        expression: &str,
    ) -> Result<bool, EvalError>
    where
        R: 'a;

    /// Dry-run check that `expression` is well-formed and boolean-typed.
    ///
    /// Called only during validation, with a synthetic record bound. Must not
    /// fail merely because the synthetic record lacks fields.
    ///
    /// # Errors
    ///
    /// The reason the expression can never produce a boolean.
    fn static_check_boolean<'a>(
        &'a self,
        ctx: &Self::Context<'a>,
        expression: &str,
    ) -> Result<(), EvalError>
    where
        R: 'a;

    /// Check that a constant can be bound under `name`.
    ///
    /// Default accepts every constant.
    ///
    /// # Errors
    ///
    /// The reason the constant cannot be bound.
    fn check_constant(&self, name: &str, value: &Value) -> Result<(), EvalError> {
        let _ = (name, value);
        Ok(())
    }
}
