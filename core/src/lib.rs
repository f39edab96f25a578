//! lanes - Expression-driven multicast record routing
//!
//! A selector stage: an ordered list of `(predicate, lane)` pairs, terminated by
//! a mandatory `default` pair, decides which output lanes each record goes to.
//!
//! # Architecture
//!
//! - [`SelectorConfig`] / [`LanePredicate`] — What the operator wrote
//! - [`RouteTableBuilder`] — Validates configuration, accumulating every [`ConfigIssue`]
//! - [`ValidatedRoutes`] — Proof of a successful validation; the only router input
//! - [`Router`] — Evaluates every predicate per record and dispatches multicast
//! - [`ExpressionEvaluator`] — The seam to the expression language
//! - [`el::ElEvaluator`] — The built-in `${...}` expression language
//!
//! # Key Invariants
//!
//! 1. **Multicast**: a record goes to every lane whose predicate is `true`, in
//!    table order. The default lane is used only when none is.
//!
//! 2. **Per-record isolation**: an evaluation error rejects the one record. It
//!    reaches no lane, and routing of other records is unaffected.
//!
//! 3. **Validate once**: a router cannot exist over an invalid table.
//!
//! # Example
//!
//! ```
//! use lanes::el::ElEvaluator;
//! use lanes::prelude::*;
//! use std::collections::BTreeMap;
//!
//! #[derive(Debug)]
//! struct Reading { id: String, x: i64 }
//!
//! impl Record for Reading {
//!     fn source_id(&self) -> &str { &self.id }
//! }
//!
//! impl RecordData for Reading {
//!     fn field(&self, path: &str) -> Option<Value> {
//!         (path == "/x").then(|| Value::Int(self.x))
//!     }
//! }
//!
//! struct Stage;
//!
//! impl HostContext for Stage {
//!     type Record = Reading;
//!
//!     fn output_lanes(&self) -> Vec<String> { vec!["A".into(), "B".into()] }
//!     fn create_record(&self, label: &str) -> Reading {
//!         Reading { id: label.into(), x: 0 }
//!     }
//! }
//!
//! let predicates = vec![
//!     LanePredicate::new("${record:value('/x') > 5}", "A"),
//!     LanePredicate::default_lane("B"),
//! ];
//! let evaluator = ElEvaluator::new();
//! let routes = RouteTableBuilder::new(&evaluator)
//!     .build(&predicates, &BTreeMap::new(), &mut Stage)
//!     .unwrap();
//! let router = Router::new(evaluator, routes);
//!
//! let big = Reading { id: "r1".into(), x: 10 };
//! let small = Reading { id: "r2".into(), x: 1 };
//! let mut ctx = router.context();
//! assert_eq!(router.route(&mut ctx, &big).unwrap().lanes(), &["A"]);
//! assert_eq!(router.route(&mut ctx, &small).unwrap().lanes(), &["B"]);
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod builder;
mod config;
mod dispatch;
mod error;
mod evaluator;
mod host;
mod record;
mod route_table;
mod router;
mod trace;
mod value;

pub mod el;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Core types
pub use config::{LanePredicate, SelectorConfig};
pub use dispatch::{Dispatch, DispatchSink, LaneBatch};
pub use evaluator::ExpressionEvaluator;
pub use host::HostContext;
pub use record::{Record, RecordData};
pub use route_table::{Constants, RouteRule, RouteTable, ValidatedRoutes};
pub use router::{BatchOutcome, OnRecordError, Router};
pub use value::Value;

// Validation
pub use builder::{is_default_predicate, is_delimited, RouteTableBuilder, VALIDATION_RECORD_LABEL};

// Errors
pub use error::{
    ConfigIssue, ConfigIssues, EvalError, IssueKind, RecordError, CONFIG_GROUP, FIELD_CONSTANTS,
    FIELD_LANE_PREDICATES,
};

// Trace types
pub use trace::{RouteStep, RouteTrace};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use lanes::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Errors
        ConfigIssue,
        ConfigIssues,
        // Core types
        Constants,
        Dispatch,
        // Traits
        DispatchSink,
        EvalError,
        ExpressionEvaluator,
        HostContext,
        LaneBatch,
        LanePredicate,
        OnRecordError,
        Record,
        RecordData,
        RecordError,
        RouteTable,
        RouteTableBuilder,
        // Trace types
        RouteTrace,
        Router,
        SelectorConfig,
        ValidatedRoutes,
        Value,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Predicate text marking the terminal catch-all pair.
pub const DEFAULT_PREDICATE: &str = "default";

/// Opening delimiter every predicate expression must start with.
pub const EXPRESSION_OPEN: &str = "${";

/// Closing delimiter every predicate expression must end with.
pub const EXPRESSION_CLOSE: &str = "}";

/// Maximum nesting depth of a parsed expression.
///
/// Protects the recursive parser and evaluator against stack overflow.
pub const MAX_EXPRESSION_DEPTH: usize = 32;

/// Maximum length for regex patterns in `str:matches`.
///
/// Regex compilation is expensive even with the linear-time Rust `regex` crate.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4096;
