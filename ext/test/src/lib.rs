//! lanes-test: Test domain for conformance testing
//!
//! Provides a JSON-backed record and a fake host for exercising the router.
//! This is the reference extension that demonstrates how to plug a record type
//! into lanes.
//!
//! # Example
//!
//! ```
//! use lanes_test::prelude::*;
//! use serde_json::json;
//!
//! // TestRecord is a JSON document plus attributes
//! let record = TestRecord::new("r1", json!({"order": {"items": [{"sku": "A-1"}]}}))
//!     .with_attribute("topic", "orders");
//!
//! // Paths use `/` segments and `[index]` list access
//! assert_eq!(record.field("/order/items[0]/sku"), Some(Value::from("A-1")));
//! assert_eq!(record.attribute("topic"), Some("orders"));
//! ```

use lanes::prelude::*;
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashSet};

#[cfg(feature = "fixtures")]
pub mod fixture;

/// Test record: an identifier, a JSON document and string attributes.
///
/// Used for conformance testing where we need predictable, controllable
/// record data.
#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    id: String,
    data: Json,
    attributes: BTreeMap<String, String>,
}

impl TestRecord {
    /// Create a record over `data`.
    pub fn new(id: impl Into<String>, data: Json) -> Self {
        Self {
            id: id.into(),
            data,
            attributes: BTreeMap::new(),
        }
    }

    /// A record with an empty object as data.
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Json::Object(serde_json::Map::new()))
    }

    /// Set the value at `path` (builder pattern).
    ///
    /// Missing objects along the path are created; list indexes are not
    /// supported here. The empty path replaces the whole document.
    #[must_use]
    pub fn with_field(mut self, path: &str, value: impl Into<Json>) -> Self {
        let segments: Vec<&str> = path
            .strip_prefix('/')
            .map(|rest| rest.split('/').collect())
            .unwrap_or_default();
        insert(&mut self.data, &segments, value.into());
        self
    }

    /// Set an attribute (builder pattern).
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// The JSON document.
    #[must_use]
    pub fn data(&self) -> &Json {
        &self.data
    }
}

impl Record for TestRecord {
    fn source_id(&self) -> &str {
        &self.id
    }
}

impl RecordData for TestRecord {
    fn field(&self, path: &str) -> Option<Value> {
        lookup(&self.data, path).map(value_from_json)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

fn insert(node: &mut Json, segments: &[&str], value: Json) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Json::Object(serde_json::Map::new());
    }
    if let Json::Object(map) = node {
        insert(
            map.entry((*first).to_owned()).or_insert(Json::Null),
            rest,
            value,
        );
    }
}

/// Resolve `/a/b[0]/c` against a JSON document. `""` is the root.
fn lookup<'v>(root: &'v Json, path: &str) -> Option<&'v Json> {
    if path.is_empty() {
        return Some(root);
    }
    path.strip_prefix('/')?
        .split('/')
        .try_fold(root, |node, segment| step(node, segment))
}

fn step<'v>(node: &'v Json, segment: &str) -> Option<&'v Json> {
    let (name, mut indexes) = segment
        .find('[')
        .map_or((segment, ""), |i| segment.split_at(i));

    let mut node = if name.is_empty() {
        node
    } else {
        node.as_object()?.get(name)?
    };
    while !indexes.is_empty() {
        let inner = indexes.strip_prefix('[')?;
        let (index, rest) = inner.split_once(']')?;
        node = node.as_array()?.get(index.parse::<usize>().ok()?)?;
        indexes = rest;
    }
    Some(node)
}

/// Convert a JSON value to a [`Value`].
///
/// Integers that fit `i64` become `Int`; other numbers become `Float`.
#[must_use]
pub fn value_from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(value_from_json).collect()),
        Json::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), value_from_json(v)))
                .collect(),
        ),
    }
}

/// Distinct output lanes of `predicates`, in first-appearance order.
///
/// The lanes a stage would declare for a configuration that names each lane
/// exactly once.
#[must_use]
pub fn declared_lanes(predicates: &[LanePredicate]) -> Vec<String> {
    let mut seen = HashSet::new();
    predicates
        .iter()
        .filter(|p| seen.insert(p.output_lane.as_str()))
        .map(|p| p.output_lane.clone())
        .collect()
}

/// Fake stage: declared lanes plus every reported issue.
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    lanes: Vec<String>,
    issues: Vec<ConfigIssue>,
}

impl FakeHost {
    /// Host declaring `lanes`.
    pub fn new<S: Into<String>>(lanes: impl IntoIterator<Item = S>) -> Self {
        Self {
            lanes: lanes.into_iter().map(Into::into).collect(),
            issues: Vec::new(),
        }
    }

    /// Host declaring exactly the lanes `predicates` route to.
    #[must_use]
    pub fn for_predicates(predicates: &[LanePredicate]) -> Self {
        Self::new(declared_lanes(predicates))
    }

    /// Issues reported so far.
    #[must_use]
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    /// Codes of the issues reported so far.
    #[must_use]
    pub fn issue_codes(&self) -> Vec<&'static str> {
        self.issues.iter().map(ConfigIssue::code).collect()
    }
}

impl HostContext for FakeHost {
    type Record = TestRecord;

    fn output_lanes(&self) -> Vec<String> {
        self.lanes.clone()
    }

    fn create_record(&self, label: &str) -> TestRecord {
        TestRecord::empty(label)
    }

    fn report_config_issue(&mut self, issue: &ConfigIssue) {
        self.issues.push(issue.clone());
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{declared_lanes, value_from_json, FakeHost, TestRecord};
    pub use lanes::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanes::el::ElEvaluator;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_record_paths() {
        let record = TestRecord::new(
            "r",
            json!({"a": {"b": [10, {"c": "deep"}]}, "n": null, "big": 1.5}),
        );
        assert_eq!(record.field("/a/b[0]"), Some(Value::Int(10)));
        assert_eq!(record.field("/a/b[1]/c"), Some(Value::from("deep")));
        assert_eq!(record.field("/n"), Some(Value::Null));
        assert_eq!(record.field("/big"), Some(Value::Float(1.5)));
        assert_eq!(record.field("/a/b[2]"), None);
        assert_eq!(record.field("/a/x"), None);
        assert_eq!(record.field("a"), None);
        assert!(matches!(record.field(""), Some(Value::Map(_))));
    }

    #[test]
    fn test_nested_list_index() {
        let record = TestRecord::new("r", json!({"m": [[1, 2], [3]]}));
        assert_eq!(record.field("/m[1][0]"), Some(Value::Int(3)));
        assert_eq!(record.field("/m[x]"), None);
        assert_eq!(record.field("/m[0"), None);
    }

    #[test]
    fn test_with_field_creates_objects() {
        let record = TestRecord::empty("r")
            .with_field("/order/total", 42)
            .with_field("/order/currency", "EUR")
            .with_field("/flag", true);
        assert_eq!(
            record.data(),
            &json!({"order": {"total": 42, "currency": "EUR"}, "flag": true})
        );
        assert_eq!(record.field("/order/total"), Some(Value::Int(42)));
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(value_from_json(&json!(u64::MAX)), Value::Float(u64::MAX as f64));
        assert_eq!(
            value_from_json(&json!([1, "a"])),
            Value::List(vec![Value::Int(1), Value::from("a")])
        );
    }

    #[test]
    fn test_declared_lanes_keep_first_appearance() {
        let predicates = vec![
            LanePredicate::new("${true}", "b"),
            LanePredicate::new("${false}", "a"),
            LanePredicate::new("${false}", "b"),
            LanePredicate::default_lane("c"),
        ];
        assert_eq!(declared_lanes(&predicates), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_fake_host_collects_issues() {
        let evaluator = ElEvaluator::new();
        let mut host = FakeHost::new(["A", "B", "C"]);
        let predicates = vec![
            LanePredicate::new("${true}", "A"),
            LanePredicate::default_lane("B"),
        ];
        let issues = RouteTableBuilder::new(&evaluator)
            .build(&predicates, &BTreeMap::new(), &mut host)
            .unwrap_err();
        assert_eq!(host.issue_codes(), vec!["LANE_COUNT_MISMATCH"]);
        assert_eq!(host.issues(), issues.issues());
    }

    #[test]
    fn test_full_router() {
        let predicates = vec![
            LanePredicate::new("${record:value('/x') > 5}", "A"),
            LanePredicate::default_lane("B"),
        ];
        let evaluator = ElEvaluator::new();
        let routes = RouteTableBuilder::new(&evaluator)
            .build(
                &predicates,
                &BTreeMap::new(),
                &mut FakeHost::for_predicates(&predicates),
            )
            .unwrap();
        let router = Router::new(evaluator, routes);

        let big = TestRecord::empty("big").with_field("/x", 10);
        let small = TestRecord::empty("small").with_field("/x", 1);
        let missing = TestRecord::empty("missing");

        let mut ctx = router.context();
        assert_eq!(router.route(&mut ctx, &big).unwrap().lanes(), &["A"]);
        assert_eq!(router.route(&mut ctx, &small).unwrap().lanes(), &["B"]);
        let err = router.route(&mut ctx, &missing).unwrap_err();
        assert_eq!(err.record_id, "missing");
        assert_eq!(err.expression, "${record:value('/x') > 5}");
    }
}
