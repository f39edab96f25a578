//! Router — Per-record multicast dispatch over a validated route table
//!
//! For each record the router evaluates every non-default predicate in table
//! order and dispatches the record to every lane whose predicate is `true`. If
//! none is, the record goes to the default lane.
//!
//! # Failure isolation
//!
//! An evaluator error on any predicate rejects the whole record: evaluation
//! stops, and the record reaches no lane, not even lanes whose predicates had
//! already matched. Matches are therefore collected first and delivered only
//! after the pass completes.

use crate::{
    Constants, Dispatch, DispatchSink, ExpressionEvaluator, Record, RecordError, RouteStep,
    RouteTable, RouteTrace, ValidatedRoutes,
};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// What to do with a record whose predicates fail to evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnRecordError {
    /// Drop the record with a warning and keep going.
    Discard,
    /// Collect the error in [`BatchOutcome::errors`] and keep going.
    #[default]
    ToError,
    /// Abort the batch and return the error.
    StopPipeline,
}

/// Result of [`Router::process_batch`].
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Records dispatched to at least one lane.
    pub routed: usize,
    /// Records dropped under [`OnRecordError::Discard`].
    pub discarded: usize,
    /// Record errors collected under [`OnRecordError::ToError`].
    pub errors: Vec<RecordError>,
}

/// Routes records of type `R` using evaluator `E`.
///
/// Holds the route table and constants behind `Arc`s; they are never mutated.
/// A `Router` is `Sync` when `E` is, so one router can serve many threads, each
/// with its own evaluation context from [`context()`](Self::context).
///
/// # Example
///
/// ```ignore
/// let routes = RouteTableBuilder::new(&evaluator).build(&config, &mut host)?;
/// let router = Router::new(evaluator, routes);
///
/// let mut ctx = router.context();
/// let dispatch = router.route(&mut ctx, &record)?;
/// ```
pub struct Router<R: ?Sized, E> {
    evaluator: E,
    table: Arc<RouteTable>,
    constants: Arc<Constants>,
    _record: PhantomData<fn(&R)>,
}

impl<R, E> Router<R, E>
where
    R: Record + ?Sized,
    E: ExpressionEvaluator<R>,
{
    /// Create a router over a validated route table.
    pub fn new(evaluator: E, routes: ValidatedRoutes) -> Self {
        tracing::debug!(
            rules = routes.table.len(),
            default_lane = routes.table.default_lane(),
            "router ready"
        );
        Self {
            evaluator,
            table: routes.table,
            constants: routes.constants,
            _record: PhantomData,
        }
    }

    /// The route table.
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// The constants bound into every evaluation.
    #[must_use]
    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// The evaluator.
    #[must_use]
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// A fresh evaluation context with the constants bound.
    ///
    /// Reuse it across records on one thread; never share it across threads.
    pub fn context<'a>(&'a self) -> E::Context<'a>
    where
        R: 'a,
    {
        let mut ctx = self.evaluator.new_context();
        self.evaluator.bind_constants(&mut ctx, &self.constants);
        ctx
    }

    /// Decide which lanes `record` goes to.
    ///
    /// Binds `record` into `ctx`, evaluates every predicate in table order and
    /// returns the matched lanes, or the default lane if none matched.
    ///
    /// # Errors
    ///
    /// [`RecordError`] for the first predicate whose evaluation fails. The
    /// remaining predicates are not evaluated.
    pub fn route<'a>(
        &'a self,
        ctx: &mut E::Context<'a>,
        record: &'a R,
    ) -> Result<Dispatch<'a>, RecordError> {
        self.evaluator.bind_record(ctx, record);

        let mut lanes = Vec::new();
        for rule in self.table.predicates() {
            let expression = rule.expression().unwrap_or_default();
            if self.eval(ctx, record, expression)? {
                tracing::trace!(
                    record = record.source_id(),
                    predicate = expression,
                    lane = rule.lane(),
                    "record satisfies predicate"
                );
                lanes.push(rule.lane());
            }
        }

        if lanes.is_empty() {
            tracing::trace!(
                record = record.source_id(),
                lane = self.table.default_lane(),
                "record satisfies no predicate, using default lane"
            );
            return Ok(Dispatch::fallback(self.table.default_lane()));
        }
        Ok(Dispatch::matched(lanes))
    }

    /// Route `record` and deliver it to `sink`.
    ///
    /// The sink is only called once every predicate evaluated successfully.
    ///
    /// # Errors
    ///
    /// See [`route()`](Self::route). On error the sink is not called.
    pub fn route_into<'a, S>(
        &'a self,
        ctx: &mut E::Context<'a>,
        record: &'a R,
        sink: &mut S,
    ) -> Result<Dispatch<'a>, RecordError>
    where
        S: DispatchSink<R> + ?Sized,
    {
        let dispatch = self.route(ctx, record)?;
        dispatch.deliver(record, sink);
        Ok(dispatch)
    }

    /// Route with a full trace of every predicate evaluated.
    ///
    /// # Errors
    ///
    /// Same as [`route()`](Self::route).
    pub fn route_with_trace<'a>(
        &'a self,
        ctx: &mut E::Context<'a>,
        record: &'a R,
    ) -> Result<RouteTrace<'a>, RecordError> {
        self.evaluator.bind_record(ctx, record);

        let mut steps = Vec::with_capacity(self.table.predicates().len());
        for (index, rule) in self.table.predicates().iter().enumerate() {
            let expression = rule.expression().unwrap_or_default();
            let matched = self.eval(ctx, record, expression)?;
            steps.push(RouteStep {
                index,
                expression,
                lane: rule.lane(),
                matched,
            });
        }

        let lanes: Vec<&str> = steps.iter().filter(|s| s.matched).map(|s| s.lane).collect();
        let used_default = lanes.is_empty();
        let lanes = if used_default {
            vec![self.table.default_lane()]
        } else {
            lanes
        };
        Ok(RouteTrace {
            steps,
            used_default,
            lanes,
        })
    }

    /// Route a batch of records into `sink`, reusing one evaluation context.
    ///
    /// Failing records are handled per `policy`. Records routed before a
    /// [`OnRecordError::StopPipeline`] abort stay delivered.
    ///
    /// # Errors
    ///
    /// The first [`RecordError`] under [`OnRecordError::StopPipeline`].
    pub fn process_batch<'a, S>(
        &'a self,
        records: impl IntoIterator<Item = &'a R>,
        sink: &mut S,
        policy: OnRecordError,
    ) -> Result<BatchOutcome, RecordError>
    where
        R: 'a,
        S: DispatchSink<R> + ?Sized,
    {
        let mut ctx = self.context();
        let mut outcome = BatchOutcome::default();

        for record in records {
            match self.route_into(&mut ctx, record, sink) {
                Ok(_) => outcome.routed += 1,
                Err(err) => match policy {
                    OnRecordError::Discard => {
                        tracing::warn!(error = %err, "discarding record");
                        outcome.discarded += 1;
                    }
                    OnRecordError::ToError => outcome.errors.push(err),
                    OnRecordError::StopPipeline => return Err(err),
                },
            }
        }
        Ok(outcome)
    }

    fn eval<'a>(
        &'a self,
        ctx: &E::Context<'a>,
        record: &R,
        expression: &str,
    ) -> Result<bool, RecordError>
    where
        R: 'a,
    {
        self.evaluator
            .evaluate_boolean(ctx, expression)
            .map_err(|source| RecordError {
                record_id: record.source_id().to_owned(),
                expression: expression.to_owned(),
                source,
            })
    }
}

impl<R: ?Sized, E: Clone> Clone for Router<R, E> {
    fn clone(&self) -> Self {
        Self {
            evaluator: self.evaluator.clone(),
            table: Arc::clone(&self.table),
            constants: Arc::clone(&self.constants),
            _record: PhantomData,
        }
    }
}

impl<R: ?Sized, E> fmt::Debug for Router<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("rules", &self.table.len())
            .field("default_lane", &self.table.default_lane())
            .field("constants", &self.constants.len())
            .finish()
    }
}

// Note: No unsafe impl needed — Router is Send/Sync whenever E is, because the
// table and constants sit behind Arc and `PhantomData<fn(&R)>` is always both.
