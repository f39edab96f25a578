//! Routing trace types for debugging selector behavior.
//!
//! Use [`Router::route_with_trace`](crate::Router::route_with_trace) to see
//! every predicate evaluated for a record, its outcome, and whether the
//! default lane was used.
//!
//! # Example
//!
//! ```ignore
//! let trace = router.route_with_trace(&mut ctx, &record)?;
//! for step in &trace.steps {
//!     println!("  rule[{}] {} -> {}: {}", step.index, step.expression, step.lane, step.matched);
//! }
//! ```

use std::fmt;

/// Trace of one routing pass.
///
/// # INV: `lanes` == `route()` result
///
/// `lanes` always equals what [`Router::route`](crate::Router::route) would
/// dispatch for the same record.
pub struct RouteTrace<'t> {
    /// One step per non-default rule, in table order. Routing is multicast,
    /// so every predicate is evaluated.
    pub steps: Vec<RouteStep<'t>>,
    /// Whether the default lane was used.
    pub used_default: bool,
    /// Lanes the record was dispatched to.
    pub lanes: Vec<&'t str>,
}

impl RouteTrace<'_> {
    /// Indexes of rules whose predicate matched.
    #[must_use]
    pub fn matched_indexes(&self) -> Vec<usize> {
        self.steps
            .iter()
            .filter(|s| s.matched)
            .map(|s| s.index)
            .collect()
    }
}

impl fmt::Debug for RouteTrace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTrace")
            .field("lanes", &self.lanes)
            .field("steps", &self.steps)
            .field("used_default", &self.used_default)
            .finish()
    }
}

/// One predicate's evaluation in a trace.
pub struct RouteStep<'t> {
    /// Index in the route table (0-based).
    pub index: usize,
    /// The evaluated predicate.
    pub expression: &'t str,
    /// Lane the rule routes to.
    pub lane: &'t str,
    /// Did the predicate evaluate to `true`?
    pub matched: bool,
}

impl fmt::Debug for RouteStep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteStep")
            .field("index", &self.index)
            .field("expression", &self.expression)
            .field("lane", &self.lane)
            .field("matched", &self.matched)
            .finish()
    }
}
