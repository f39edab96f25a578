//! Error taxonomy.
//!
//! Two families, never mixed:
//!
//! - **Configuration issues** ([`ConfigIssue`], [`ConfigIssues`]) — found once by
//!   the [`RouteTableBuilder`](crate::RouteTableBuilder), all accumulated, fatal
//!   before any record flows.
//! - **Record errors** ([`RecordError`]) — one record failed to evaluate; the
//!   caller decides what happens to it, the stream continues.
//!
//! [`EvalError`] is the evaluator-level cause carried by both.

use std::fmt;
use thiserror::Error;

/// Configuration group all selector issues are reported under.
pub const CONFIG_GROUP: &str = "CONDITIONS";

/// Configuration field holding the ordered lane predicates.
pub const FIELD_LANE_PREDICATES: &str = "lanePredicates";

/// Configuration field holding the constants mapping.
pub const FIELD_CONSTANTS: &str = "constants";

// ═══════════════════════════════════════════════════════════════════════════════
// Evaluator errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure raised by an [`ExpressionEvaluator`](crate::ExpressionEvaluator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The expression text could not be parsed.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset into the expression text.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// A `ns:name(..)` call names no registered function.
    #[error("unknown function \"{name}\"")]
    UnknownFunction {
        /// Qualified function name.
        name: String,
    },

    /// An identifier resolves to no constant.
    #[error("unknown variable \"{name}\"")]
    UnknownVariable {
        /// The identifier.
        name: String,
    },

    /// A function was called with the wrong number of arguments.
    #[error("function \"{name}\" takes {expected} argument(s), got {actual}")]
    Arity {
        /// Qualified function name.
        name: String,
        /// Declared argument count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// An operator or function received a value of the wrong kind.
    #[error("type error: {0}")]
    Type(String),

    /// `record:value` addressed a field the record does not have.
    #[error("field \"{path}\" does not exist in the record")]
    MissingField {
        /// The requested path.
        path: String,
    },

    /// The expression produced a non-boolean result.
    #[error("expression evaluated to {kind}, expected a boolean")]
    NotBoolean {
        /// Kind of the value produced.
        kind: &'static str,
    },

    /// A regular expression literal is invalid or too long.
    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Expression nesting exceeds the parser limit.
    #[error("expression nesting depth exceeds the maximum of {max}")]
    DepthExceeded {
        /// Maximum allowed depth.
        max: usize,
    },

    /// Record functions were used with no record bound into the context.
    #[error("no record bound into the evaluation context")]
    NoRecordBound,

    /// Free-form failure from a third-party evaluator.
    #[error("{0}")]
    Custom(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration issues
// ═══════════════════════════════════════════════════════════════════════════════

/// What is wrong with a selector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueKind {
    /// No lane predicates were configured.
    #[error("at least one lane predicate is required")]
    EmptyRoutes,

    /// Routes and declared output lanes are not 1:1.
    #[error(
        "{configured} lane predicate(s) configured but the stage declares {declared} output lane(s)"
    )]
    LaneCountMismatch {
        /// Number of configured lane predicates.
        configured: usize,
        /// Number of declared output lanes.
        declared: usize,
    },

    /// A route targets a lane the stage does not declare.
    #[error("output lane \"{lane}\" of predicate \"{expression}\" is not a declared output lane")]
    UnknownLane {
        /// The undeclared lane.
        lane: String,
        /// The predicate routing to it.
        expression: String,
    },

    /// Two lane predicates route to the same lane.
    #[error("output lane \"{lane}\" is targeted by more than one lane predicate")]
    DuplicateLane {
        /// The repeated lane.
        lane: String,
    },

    /// The last lane predicate is not the `default` sentinel.
    #[error("the last lane predicate must be \"default\"")]
    MissingDefault,

    /// A predicate is not wrapped in `${` … `}`.
    #[error("predicate \"{expression}\" must start with \"${{\" and end with \"}}\"")]
    MalformedExpression {
        /// The offending predicate.
        expression: String,
    },

    /// A predicate failed the evaluator's boolean static check.
    #[error("invalid predicate \"{expression}\": {cause}")]
    InvalidExpression {
        /// The offending predicate.
        expression: String,
        /// The evaluator's reason.
        cause: EvalError,
    },

    /// A constant was rejected during resolution.
    #[error("invalid constant \"{name}\": {cause}")]
    InvalidConstant {
        /// The constant's name.
        name: String,
        /// The evaluator's reason.
        cause: EvalError,
    },
}

impl IssueKind {
    /// Stable error code for this issue.
    ///
    /// ```
    /// use lanes::IssueKind;
    ///
    /// assert_eq!(IssueKind::MissingDefault.code(), "MISSING_DEFAULT");
    /// ```
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyRoutes => "EMPTY_ROUTES",
            Self::LaneCountMismatch { .. } => "LANE_COUNT_MISMATCH",
            Self::UnknownLane { .. } => "UNKNOWN_LANE",
            Self::DuplicateLane { .. } => "DUPLICATE_LANE",
            Self::MissingDefault => "MISSING_DEFAULT",
            Self::MalformedExpression { .. } => "MALFORMED_EXPRESSION",
            Self::InvalidExpression { .. } => "INVALID_EXPRESSION",
            Self::InvalidConstant { .. } => "INVALID_CONSTANT",
        }
    }
}

/// One configuration problem, located by group and field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Configuration group (always [`CONFIG_GROUP`]).
    pub group: &'static str,
    /// Configuration field the issue belongs to.
    pub field: &'static str,
    /// The problem itself.
    pub kind: IssueKind,
}

impl ConfigIssue {
    /// Issue against the lane predicates field.
    #[must_use]
    pub fn lane_predicates(kind: IssueKind) -> Self {
        Self {
            group: CONFIG_GROUP,
            field: FIELD_LANE_PREDICATES,
            kind,
        }
    }

    /// Issue against the constants field.
    #[must_use]
    pub fn constants(kind: IssueKind) -> Self {
        Self {
            group: CONFIG_GROUP,
            field: FIELD_CONSTANTS,
            kind,
        }
    }

    /// Stable error code, see [`IssueKind::code`].
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {}: {}",
            self.group,
            self.field,
            self.kind.code(),
            self.kind
        )
    }
}

impl std::error::Error for ConfigIssue {}

/// Every issue found while building a route table.
///
/// Never empty: a build with no issues produces a table instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssues(Vec<ConfigIssue>);

impl ConfigIssues {
    pub(crate) fn new(issues: Vec<ConfigIssue>) -> Self {
        debug_assert!(!issues.is_empty());
        Self(issues)
    }

    /// The issues in detection order.
    #[must_use]
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.0
    }

    /// Error codes in detection order.
    #[must_use]
    pub fn codes(&self) -> Vec<&'static str> {
        self.0.iter().map(ConfigIssue::code).collect()
    }

    /// Returns `true` if any issue carries `code`.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|i| i.code() == code)
    }

    /// Number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unwrap into the underlying list.
    #[must_use]
    pub fn into_vec(self) -> Vec<ConfigIssue> {
        self.0
    }
}

impl fmt::Display for ConfigIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration issue(s)", self.0.len())?;
        for issue in &self.0 {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigIssues {}

impl IntoIterator for ConfigIssues {
    type Item = ConfigIssue;
    type IntoIter = std::vec::IntoIter<ConfigIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConfigIssues {
    type Item = &'a ConfigIssue;
    type IntoIter = std::slice::Iter<'a, ConfigIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Record errors
// ═══════════════════════════════════════════════════════════════════════════════

/// A single record could not be routed.
///
/// The record was dispatched to no lane. What happens to it next (error queue,
/// discard, stop) is the caller's decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record \"{record_id}\" failed predicate \"{expression}\": {source}")]
pub struct RecordError {
    /// [`Record::source_id`](crate::Record::source_id) of the failing record.
    pub record_id: String,
    /// The predicate whose evaluation failed.
    pub expression: String,
    /// Underlying evaluator failure.
    #[source]
    pub source: EvalError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_codes_are_stable() {
        let kinds = [
            (IssueKind::EmptyRoutes, "EMPTY_ROUTES"),
            (
                IssueKind::LaneCountMismatch {
                    configured: 2,
                    declared: 3,
                },
                "LANE_COUNT_MISMATCH",
            ),
            (
                IssueKind::UnknownLane {
                    lane: "x".into(),
                    expression: "${true}".into(),
                },
                "UNKNOWN_LANE",
            ),
            (
                IssueKind::DuplicateLane { lane: "A".into() },
                "DUPLICATE_LANE",
            ),
            (IssueKind::MissingDefault, "MISSING_DEFAULT"),
            (
                IssueKind::MalformedExpression {
                    expression: "true".into(),
                },
                "MALFORMED_EXPRESSION",
            ),
        ];
        for (kind, code) in kinds {
            assert_eq!(kind.code(), code);
        }
    }

    #[test]
    fn test_lane_count_mismatch_message() {
        let issue = ConfigIssue::lane_predicates(IssueKind::LaneCountMismatch {
            configured: 2,
            declared: 3,
        });
        let msg = issue.to_string();
        assert!(msg.starts_with("CONDITIONS/lanePredicates LANE_COUNT_MISMATCH"));
        assert!(msg.contains("2 lane predicate(s)"));
        assert!(msg.contains("3 output lane(s)"));
    }

    #[test]
    fn test_malformed_message_escapes_braces() {
        let kind = IssueKind::MalformedExpression {
            expression: "a > 1".into(),
        };
        assert_eq!(
            kind.to_string(),
            "predicate \"a > 1\" must start with \"${\" and end with \"}\""
        );
    }

    #[test]
    fn test_config_issues_display_lists_all() {
        let issues = ConfigIssues::new(vec![
            ConfigIssue::lane_predicates(IssueKind::MissingDefault),
            ConfigIssue::constants(IssueKind::InvalidConstant {
                name: "1x".into(),
                cause: EvalError::Custom("bad name".into()),
            }),
        ]);
        let msg = issues.to_string();
        assert!(msg.starts_with("2 configuration issue(s)"));
        assert!(msg.contains("MISSING_DEFAULT"));
        assert!(msg.contains("CONDITIONS/constants INVALID_CONSTANT"));
        assert_eq!(issues.codes(), vec!["MISSING_DEFAULT", "INVALID_CONSTANT"]);
    }

    #[test]
    fn test_record_error_source_chain() {
        use std::error::Error as _;
        let err = RecordError {
            record_id: "r-7".into(),
            expression: "${record:value('/x') > 5}".into(),
            source: EvalError::MissingField { path: "/x".into() },
        };
        assert!(err.to_string().contains("r-7"));
        assert!(err.to_string().contains("${record:value('/x') > 5}"));
        assert!(err.source().is_some());
    }
}
