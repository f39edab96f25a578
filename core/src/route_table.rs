//! `RouteTable` — The validated, immutable ordered rule list
//!
//! A `RouteTable` can only be produced by the
//! [`RouteTableBuilder`](crate::RouteTableBuilder), which is what guarantees its
//! invariants. It is shared read-only by every routing pass.

use crate::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One routing rule: a predicate and the lane it routes to.
///
/// `expression` is `None` only for the terminal default rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    expression: Option<String>,
    lane: String,
}

impl RouteRule {
    pub(crate) fn predicate(expression: String, lane: String) -> Self {
        Self {
            expression: Some(expression),
            lane,
        }
    }

    pub(crate) fn fallback(lane: String) -> Self {
        Self {
            expression: None,
            lane,
        }
    }

    /// The predicate, or `None` for the default rule.
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Lane records are dispatched to.
    #[must_use]
    pub fn lane(&self) -> &str {
        &self.lane
    }

    /// Returns `true` for the terminal default rule.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.expression.is_none()
    }
}

/// Ordered sequence of [`RouteRule`]s.
///
/// # Invariants
///
/// - Non-empty; exactly one rule has no expression, and it is the last one.
/// - Every other rule carries a `${...}` expression that passed the
///   evaluator's boolean static check.
/// - Order equals configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub(crate) fn new(predicates: Vec<RouteRule>, default_lane: String) -> Self {
        debug_assert!(predicates.iter().all(|r| !r.is_default()));
        let mut rules = predicates;
        rules.push(RouteRule::fallback(default_lane));
        Self { rules }
    }

    /// All rules, default last.
    #[must_use]
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Rules carrying an expression, in evaluation order.
    #[must_use]
    pub fn predicates(&self) -> &[RouteRule] {
        &self.rules[..self.rules.len() - 1]
    }

    /// The terminal default rule.
    #[must_use]
    pub fn default_rule(&self) -> &RouteRule {
        &self.rules[self.rules.len() - 1]
    }

    /// Lane of the default rule.
    #[must_use]
    pub fn default_lane(&self) -> &str {
        self.default_rule().lane()
    }

    /// Number of rules including the default.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always `false`: a table holds at least the default rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Named constants bound into every evaluation.
///
/// Sorted by name. Immutable once handed to a [`Router`](crate::Router).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants {
    values: BTreeMap<String, Value>,
}

impl Constants {
    /// No constants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a constant by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns `true` if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of constants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no constants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Constants {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A route table and its constants, both proven consistent.
///
/// The only way to obtain one is a successful
/// [`RouteTableBuilder::build`](crate::RouteTableBuilder::build), and it is
/// the only input [`Router::new`](crate::Router::new) accepts.
#[derive(Debug, Clone)]
pub struct ValidatedRoutes {
    pub(crate) table: Arc<RouteTable>,
    pub(crate) constants: Arc<Constants>,
}

impl ValidatedRoutes {
    /// The route table.
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// The resolved constants.
    #[must_use]
    pub fn constants(&self) -> &Constants {
        &self.constants
    }
}
