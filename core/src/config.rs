//! Configuration surface of the selector.
//!
//! ```yaml
//! lanePredicates:
//!   - outputLane: big
//!     predicate: "${record:value('/x') > LIMIT}"
//!   - outputLane: rest
//!     predicate: default
//! constants:
//!   LIMIT: 5
//! ```
//!
//! The last entry's predicate is the literal sentinel `default` (see
//! [`DEFAULT_PREDICATE`](crate::DEFAULT_PREDICATE)). It names the fallback lane
//! and is never evaluated.

use crate::Value;
use std::collections::BTreeMap;

/// One configured `(predicate, output lane)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LanePredicate {
    /// Lane that receives records satisfying `predicate`.
    pub output_lane: String,

    /// `${...}` boolean expression, or `default` for the fallback lane.
    pub predicate: String,
}

impl LanePredicate {
    /// Create a lane predicate.
    pub fn new(predicate: impl Into<String>, output_lane: impl Into<String>) -> Self {
        Self {
            output_lane: output_lane.into(),
            predicate: predicate.into(),
        }
    }

    /// The fallback entry: `default` routed to `output_lane`.
    pub fn default_lane(output_lane: impl Into<String>) -> Self {
        Self::new(crate::DEFAULT_PREDICATE, output_lane)
    }

    /// Returns `true` if this entry is the `default` sentinel.
    #[must_use]
    pub fn is_default(&self) -> bool {
        crate::is_default_predicate(&self.predicate)
    }
}

/// Complete selector configuration: ordered lane predicates plus constants.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SelectorConfig {
    /// Lane predicates in evaluation order, `default` last.
    pub lane_predicates: Vec<LanePredicate>,

    /// Named constants available to every predicate.
    #[cfg_attr(feature = "serde", serde(default))]
    pub constants: BTreeMap<String, Value>,
}
