//! `RouteTableBuilder` — Validate configuration into a [`ValidatedRoutes`]
//!
//! Validation never stops at the first problem. Every check runs and every
//! issue found is reported together, so an operator can fix a configuration in
//! one pass.
//!
//! # Checks
//!
//! | Code | Condition |
//! |------|-----------|
//! | `EMPTY_ROUTES` | no lane predicates |
//! | `LANE_COUNT_MISMATCH` | predicate count ≠ declared lane count |
//! | `UNKNOWN_LANE` | a predicate's lane is not declared |
//! | `MISSING_DEFAULT` | the last predicate is not `default` |
//! | `MALFORMED_EXPRESSION` | a predicate is not wrapped in `${` … `}` |
//! | `INVALID_EXPRESSION` | a predicate fails the evaluator's boolean static check |
//! | `INVALID_CONSTANT` | the evaluator rejects a constant |
//!
//! The `default` sentinel is a configuration convention. It is recognised by
//! string equality and never handed to the evaluator.

use crate::{
    ConfigIssue, ConfigIssues, Constants, ExpressionEvaluator, HostContext, IssueKind,
    LanePredicate, RouteRule, RouteTable, SelectorConfig, ValidatedRoutes, Value,
    DEFAULT_PREDICATE, EXPRESSION_CLOSE, EXPRESSION_OPEN,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Label of the synthetic record used for static checks.
pub const VALIDATION_RECORD_LABEL: &str = "forValidation";

/// Builds route tables, checking them with evaluator `E`.
///
/// # Example
///
/// ```ignore
/// let evaluator = ElEvaluator::new();
/// let routes = RouteTableBuilder::new(&evaluator)
///     .build(&config.lane_predicates, &config.constants, &mut host)?;
/// let router = Router::new(evaluator, routes);
/// ```
#[derive(Debug)]
pub struct RouteTableBuilder<'e, E> {
    evaluator: &'e E,
}

impl<'e, E> RouteTableBuilder<'e, E> {
    /// Create a builder that validates with `evaluator`.
    #[must_use]
    pub fn new(evaluator: &'e E) -> Self {
        Self { evaluator }
    }

    /// Validate a whole [`SelectorConfig`].
    ///
    /// # Errors
    ///
    /// See [`build()`](Self::build).
    pub fn build_config<H>(
        &self,
        config: &SelectorConfig,
        host: &mut H,
    ) -> Result<ValidatedRoutes, ConfigIssues>
    where
        H: HostContext,
        E: ExpressionEvaluator<H::Record>,
    {
        self.build(&config.lane_predicates, &config.constants, host)
    }

    /// Validate `lane_predicates` and `constants` against the host's declared
    /// output lanes.
    ///
    /// Each issue is also passed to [`HostContext::report_config_issue`] as it
    /// is found.
    ///
    /// # Errors
    ///
    /// [`ConfigIssues`] holding every problem found. No table is produced.
    pub fn build<H>(
        &self,
        lane_predicates: &[LanePredicate],
        constants: &BTreeMap<String, Value>,
        host: &mut H,
    ) -> Result<ValidatedRoutes, ConfigIssues>
    where
        H: HostContext,
        E: ExpressionEvaluator<H::Record>,
    {
        let mut issues = Vec::new();

        for lp in lane_predicates {
            tracing::debug!(
                predicate = %lp.predicate,
                lane = %lp.output_lane,
                "configured lane predicate"
            );
        }

        let resolved = self.resolve_constants::<H::Record>(constants, &mut issues);

        if lane_predicates.is_empty() {
            issues.push(ConfigIssue::lane_predicates(IssueKind::EmptyRoutes));
        } else {
            self.check_lanes(lane_predicates, &host.output_lanes(), &mut issues);
            self.check_predicates(lane_predicates, &resolved, host, &mut issues);
        }

        if !issues.is_empty() {
            for issue in &issues {
                tracing::warn!(code = issue.code(), "{issue}");
                host.report_config_issue(issue);
            }
            return Err(ConfigIssues::new(issues));
        }

        // Non-empty and last is the sentinel, both checked above.
        let (default, predicates) = match lane_predicates.split_last() {
            Some(split) => split,
            None => {
                return Err(ConfigIssues::new(vec![ConfigIssue::lane_predicates(
                    IssueKind::EmptyRoutes,
                )]))
            }
        };
        let rules = predicates
            .iter()
            .map(|lp| RouteRule::predicate(lp.predicate.clone(), lp.output_lane.clone()))
            .collect();
        let table = RouteTable::new(rules, default.output_lane.clone());
        tracing::debug!(
            rules = table.len(),
            default_lane = table.default_lane(),
            constants = resolved.len(),
            "route table built"
        );

        Ok(ValidatedRoutes {
            table: Arc::new(table),
            constants: Arc::new(resolved),
        })
    }

    /// Keep every constant the evaluator accepts; report the rest.
    fn resolve_constants<R>(
        &self,
        constants: &BTreeMap<String, Value>,
        issues: &mut Vec<ConfigIssue>,
    ) -> Constants
    where
        E: ExpressionEvaluator<R>,
    {
        constants
            .iter()
            .filter(|(name, value)| match self.evaluator.check_constant(name, value) {
                Ok(()) => true,
                Err(cause) => {
                    issues.push(ConfigIssue::constants(IssueKind::InvalidConstant {
                        name: (*name).clone(),
                        cause,
                    }));
                    false
                }
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Count, membership and uniqueness of output lanes.
    fn check_lanes(
        &self,
        lane_predicates: &[LanePredicate],
        declared: &[String],
        issues: &mut Vec<ConfigIssue>,
    ) {
        let declared: HashSet<&str> = declared.iter().map(String::as_str).collect();

        if lane_predicates.len() != declared.len() {
            issues.push(ConfigIssue::lane_predicates(IssueKind::LaneCountMismatch {
                configured: lane_predicates.len(),
                declared: declared.len(),
            }));
        }

        let mut seen = HashSet::new();
        let mut repeated = HashSet::new();
        for lp in lane_predicates {
            let lane = lp.output_lane.as_str();
            if !declared.contains(lane) {
                issues.push(ConfigIssue::lane_predicates(IssueKind::UnknownLane {
                    lane: lp.output_lane.clone(),
                    expression: lp.predicate.clone(),
                }));
            }
            // One issue per repeated lane, however often it repeats.
            if !seen.insert(lane) && repeated.insert(lane) {
                issues.push(ConfigIssue::lane_predicates(IssueKind::DuplicateLane {
                    lane: lp.output_lane.clone(),
                }));
            }
        }
    }

    /// Default sentinel position, delimiters, and boolean static checks.
    fn check_predicates<H>(
        &self,
        lane_predicates: &[LanePredicate],
        constants: &Constants,
        host: &H,
        issues: &mut Vec<ConfigIssue>,
    ) where
        H: HostContext,
        E: ExpressionEvaluator<H::Record>,
    {
        let Some((last, predicates)) = lane_predicates.split_last() else {
            return;
        };
        if !last.is_default() {
            issues.push(ConfigIssue::lane_predicates(IssueKind::MissingDefault));
        }

        let record = host.create_record(VALIDATION_RECORD_LABEL);
        let mut ctx = self.evaluator.new_context();
        self.evaluator.bind_constants(&mut ctx, constants);
        self.evaluator.bind_record(&mut ctx, &record);

        // A non-terminal `default` is not exempt: it is checked like any predicate.
        let candidates = predicates
            .iter()
            .chain((!last.is_default()).then_some(last));
        for lp in candidates {
            let expr = lp.predicate.as_str();
            if !is_delimited(expr) {
                issues.push(ConfigIssue::lane_predicates(
                    IssueKind::MalformedExpression {
                        expression: expr.to_owned(),
                    },
                ));
                continue;
            }
            if let Err(cause) = self.evaluator.static_check_boolean(&ctx, expr) {
                issues.push(ConfigIssue::lane_predicates(IssueKind::InvalidExpression {
                    expression: expr.to_owned(),
                    cause,
                }));
            }
        }
    }
}

/// Returns `true` if `expr` is wrapped in `${` … `}`.
///
/// ```
/// use lanes::is_delimited;
///
/// assert!(is_delimited("${a > 1}"));
/// assert!(!is_delimited("a > 1"));
/// assert!(!is_delimited("${"));
/// ```
#[must_use]
pub fn is_delimited(expr: &str) -> bool {
    expr.len() >= EXPRESSION_OPEN.len() + EXPRESSION_CLOSE.len()
        && expr.starts_with(EXPRESSION_OPEN)
        && expr.ends_with(EXPRESSION_CLOSE)
}

/// Returns `true` if `predicate` is the `default` sentinel.
#[must_use]
pub fn is_default_predicate(predicate: &str) -> bool {
    predicate == DEFAULT_PREDICATE
}
