//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against the lanes router.
//!
//! ```yaml
//! name: threshold
//! description: records above the limit go to A
//! config:
//!   lanePredicates:
//!     - outputLane: A
//!       predicate: "${record:value('/x') > LIMIT}"
//!     - outputLane: B
//!       predicate: default
//!   constants:
//!     LIMIT: 5
//! cases:
//!   - name: above
//!     record: { x: 10 }
//!     expect: [A]
//!   - name: missing field
//!     record: {}
//!     expect_error: "/x"
//! ```
//!
//! A fixture with `expect_issues` expects the build to fail with exactly those
//! issue codes, and has no cases.

use crate::{declared_lanes, FakeHost, TestRecord};
use lanes::el::ElEvaluator;
use lanes::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A complete test fixture
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Declared output lanes; defaults to the configured lanes.
    #[serde(default)]
    pub lanes: Option<Vec<String>>,
    pub config: SelectorConfig,
    /// Issue codes the build must fail with.
    #[serde(default)]
    pub expect_issues: Vec<String>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

/// Test case: one record and where it must go
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub record: serde_json::Value,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Lanes in table order.
    #[serde(default)]
    pub expect: Vec<String>,
    /// Substring of the expected record error.
    #[serde(default)]
    pub expect_error: Option<String>,
}

impl TestCase {
    /// Build a `TestRecord` named after this case
    pub fn build_record(&self) -> TestRecord {
        self.attributes.iter().fold(
            TestRecord::new(self.name.clone(), self.record.clone()),
            |record, (k, v)| record.with_attribute(k.clone(), v.clone()),
        )
    }

    fn expected(&self) -> String {
        match &self.expect_error {
            Some(error) => format!("error containing {error:?}"),
            None => format!("{:?}", self.expect),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single test case
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
}

impl Fixture {
    /// Parse a fixture from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Validate the configuration against a fake host
    pub fn build(&self) -> Result<Router<TestRecord, ElEvaluator>, ConfigIssues> {
        let lanes = self
            .lanes
            .clone()
            .unwrap_or_else(|| declared_lanes(&self.config.lane_predicates));
        let evaluator = ElEvaluator::new();
        let routes = RouteTableBuilder::new(&evaluator)
            .build_config(&self.config, &mut FakeHost::new(lanes))?;
        Ok(Router::new(evaluator, routes))
    }

    /// Run all test cases and return results
    pub fn run(&self) -> Vec<CaseResult> {
        if !self.expect_issues.is_empty() {
            return vec![self.run_build_failure()];
        }

        let router = match self.build() {
            Ok(router) => router,
            Err(issues) => {
                return vec![CaseResult {
                    case_name: "build".into(),
                    passed: false,
                    expected: "a valid route table".into(),
                    actual: issues.to_string(),
                }]
            }
        };

        let records: Vec<TestRecord> = self.cases.iter().map(TestCase::build_record).collect();
        let mut ctx = router.context();
        self.cases
            .iter()
            .zip(&records)
            .map(|(case, record)| {
                let (passed, actual) = match router.route(&mut ctx, record) {
                    Ok(dispatch) => {
                        let lanes: Vec<String> =
                            dispatch.lanes().iter().map(|l| (*l).to_owned()).collect();
                        (
                            case.expect_error.is_none() && lanes == case.expect,
                            format!("{lanes:?}"),
                        )
                    }
                    Err(err) => {
                        let message = err.to_string();
                        let passed = case
                            .expect_error
                            .as_deref()
                            .is_some_and(|want| message.contains(want));
                        (passed, message)
                    }
                };
                CaseResult {
                    case_name: case.name.clone(),
                    passed,
                    expected: case.expected(),
                    actual,
                }
            })
            .collect()
    }

    fn run_build_failure(&self) -> CaseResult {
        let mut expected: Vec<&str> = self.expect_issues.iter().map(String::as_str).collect();
        expected.sort_unstable();

        let (passed, actual) = match self.build() {
            Ok(_) => (false, "a valid route table".to_owned()),
            Err(issues) => {
                let mut codes = issues.codes();
                codes.sort_unstable();
                (codes == expected, format!("{codes:?}"))
            }
        };
        CaseResult {
            case_name: "build".into(),
            passed,
            expected: format!("{expected:?}"),
            actual,
        }
    }

    /// Run all test cases and panic on first failure
    pub fn run_and_assert(&self) {
        let results = self.run();
        for result in results {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {}, got {}",
                self.name, result.case_name, result.expected, result.actual
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: &str = r#"
name: threshold
config:
  lanePredicates:
    - outputLane: A
      predicate: "${record:value('/x') > 5}"
    - outputLane: B
      predicate: default
cases:
  - name: big
    record: { x: 10 }
    expect: [A]
  - name: small
    record: { x: 1 }
    expect: [B]
  - name: absent
    record: {}
    expect_error: "/x"
"#;

    #[test]
    fn test_parse_and_run() {
        let fixture = Fixture::from_yaml(THRESHOLD).unwrap();
        assert_eq!(fixture.cases.len(), 3);
        fixture.run_and_assert();
    }

    #[test]
    fn test_wrong_expectation_fails() {
        let mut fixture = Fixture::from_yaml(THRESHOLD).unwrap();
        fixture.cases[0].expect = vec!["B".into()];
        let results = fixture.run();
        assert!(!results[0].passed);
        assert_eq!(results[0].actual, r#"["A"]"#);
        assert!(results[1].passed);
    }

    #[test]
    fn test_build_failure_fixture() {
        let yaml = r#"
name: missing default
lanes: [A, B]
config:
  lanePredicates:
    - { outputLane: A, predicate: "${true}" }
    - { outputLane: B, predicate: "${false}" }
expect_issues: [MISSING_DEFAULT]
"#;
        let fixture = Fixture::from_yaml(yaml).unwrap();
        fixture.run_and_assert();
    }

    #[test]
    fn test_multi_document() {
        let yaml = format!("{THRESHOLD}\n---\n{THRESHOLD}");
        assert_eq!(Fixture::from_yaml_multi(&yaml).unwrap().len(), 2);
    }
}
