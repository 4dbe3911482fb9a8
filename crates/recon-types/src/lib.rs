//! Shared data model for source/target API reconciliation runs.
//!
//! Test cases flow from the planner into the fetcher, fetch results flow into
//! the comparator, and comparison rows end up in the report workbook. Every
//! stage keys its records by `test_id`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter name whose value always comes from the JSON test data.
pub const REPORTING_DATE_PARAM: &str = "reportingDate";

/// One concrete source/target request pair produced by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub tag: String,
    pub endpoint: String,
    pub source_url: String,
    pub target_url: String,
    #[serde(default)]
    pub resolved_params: BTreeMap<String, String>,
    /// 1-based spreadsheet row (header is row 1) the case was expanded from.
    #[serde(default)]
    pub source_row: usize,
}

/// Formats the deterministic per-tag test identifier, e.g. `Pricing_001`.
pub fn format_test_id(tag: &str, sequence: u32) -> String {
    format!("{tag}_{sequence:03}")
}

/// Catalog key identifying an endpoint on one environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointKey {
    pub tag: String,
    pub method: String,
    pub endpoint: String,
}

impl EndpointKey {
    /// Builds a key with trimmed fields and an upper-cased method.
    pub fn new(tag: &str, method: &str, endpoint: &str) -> Self {
        Self {
            tag: tag.trim().to_string(),
            method: method.trim().to_ascii_uppercase(),
            endpoint: endpoint.trim().to_string(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.method, self.endpoint, self.tag)
    }
}

/// One inclusion row: an endpoint template plus the raw allowed values per parameter column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub tag: String,
    pub method: String,
    pub endpoint_template: String,
    /// Parameter column name (as written in the header) to its allowed values.
    pub allowed_param_values: BTreeMap<String, Vec<String>>,
    pub row: usize,
}

impl EndpointSpec {
    pub fn key(&self) -> EndpointKey {
        EndpointKey::new(&self.tag, &self.method, &self.endpoint_template)
    }
}

/// Blacklist of parameter values; a case resolving any of them is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRules {
    rules: BTreeMap<String, BTreeSet<String>>,
}

impl ExclusionRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds forbidden values for `param`; repeated inserts are set unions.
    pub fn insert<I, S>(&mut self, param: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.rules.entry(param.trim().to_string()).or_default();
        for value in values {
            let value = value.into();
            let value = value.trim();
            if !value.is_empty() {
                entry.insert(value.to_string());
            }
        }
    }

    /// Unions another rule set into this one.
    pub fn merge(&mut self, other: &ExclusionRules) {
        for (param, values) in &other.rules {
            self.insert(param, values.iter().cloned());
        }
    }

    pub fn is_excluded(&self, param: &str, value: &str) -> bool {
        self.rules
            .get(param)
            .is_some_and(|values| values.contains(value.trim()))
    }

    /// Returns the first `(param, value)` pair of `params` that is blacklisted.
    pub fn first_violation<'a>(
        &self,
        params: &'a BTreeMap<String, String>,
    ) -> Option<(&'a str, &'a str)> {
        params
            .iter()
            .find(|(param, value)| self.is_excluded(param, value))
            .map(|(param, value)| (param.as_str(), value.as_str()))
    }

    /// Parameters and their forbidden values, ordered by parameter name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.rules
            .iter()
            .map(|(param, values)| (param.as_str(), values))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.values().all(BTreeSet::is_empty)
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(BTreeSet::len).sum()
    }
}

/// Decoded response body: JSON when it parses, raw text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Parses `raw` as JSON, falling back to text.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    /// Renders the body back to a string for files and snapshots.
    pub fn render(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Outcome of the paired fetch for one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub test_id: String,
    pub endpoint: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub source_status: Option<u16>,
    pub target_status: Option<u16>,
    pub source_body: Option<ResponseBody>,
    pub target_body: Option<ResponseBody>,
    /// Transport-level failures only; HTTP error statuses are not errors.
    pub error: Option<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl FetchResult {
    /// An empty result for `case`, before either side has been fetched.
    pub fn pending(case: &TestCase) -> Self {
        Self {
            test_id: case.id.clone(),
            endpoint: case.endpoint.clone(),
            params: case.resolved_params.clone(),
            source_status: None,
            target_status: None,
            source_body: None,
            target_body: None,
            error: None,
            elapsed_ms: 0,
        }
    }

    /// Appends a side-labelled transport error.
    pub fn record_error(&mut self, side: Side, message: &str) {
        let entry = format!("{side}: {message}");
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{existing}; {entry}"),
            None => entry,
        });
    }
}

/// Which environment a request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }

    /// Upper-case label used in response file names.
    pub fn file_label(self) -> &'static str {
        match self {
            Self::Source => "SOURCE",
            Self::Target => "TARGET",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary comparison verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    Match,
    NotMatch,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Match => "Match",
            Self::NotMatch => "NotMatch",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub test_id: String,
    pub tag: String,
    pub endpoint: String,
    pub source_url: String,
    pub target_url: String,
    pub source_status: Option<u16>,
    pub target_status: Option<u16>,
    pub status: MatchStatus,
    pub diff_detail: String,
    pub error: Option<String>,
    pub source_snapshot: String,
    pub target_snapshot: String,
}

/// Raw record of a run, written before the report so it can be re-compared offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDump {
    pub generated_at: DateTime<Utc>,
    pub test_cases: Vec<TestCase>,
    pub results: Vec<FetchResult>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    fn sample_case() -> TestCase {
        TestCase {
            id: format_test_id("Pricing", 1),
            tag: "Pricing".to_string(),
            endpoint: "/v1/price/{ccy}".to_string(),
            source_url: "https://src/v1/price/USD".to_string(),
            target_url: "https://tgt/v1/price/USD".to_string(),
            resolved_params: BTreeMap::from([("ccy".to_string(), "USD".to_string())]),
            source_row: 2,
        }
    }

    #[test]
    fn unit_format_test_id_pads_to_three_digits_minimum() {
        assert_eq!(format_test_id("Pricing", 1), "Pricing_001");
        assert_eq!(format_test_id("Pricing", 42), "Pricing_042");
        assert_eq!(format_test_id("Pricing", 1234), "Pricing_1234");
    }

    #[test]
    fn unit_endpoint_key_normalizes_method_and_whitespace() {
        let left = EndpointKey::new(" Pricing ", "get", "/v1/price/{ccy} ");
        let right = EndpointKey::new("Pricing", "GET", "/v1/price/{ccy}");
        assert_eq!(left, right);
        assert_eq!(right.to_string(), "GET /v1/price/{ccy} [Pricing]");
    }

    #[test]
    fn unit_exclusion_rules_merge_is_idempotent() {
        let mut rules = ExclusionRules::new();
        rules.insert("ccy", ["EUR", " JPY ", ""]);
        let snapshot = rules.clone();
        rules.merge(&snapshot);
        rules.merge(&snapshot);
        assert_eq!(rules, snapshot);
        assert_eq!(rules.len(), 2);
        assert!(rules.is_excluded("ccy", "JPY"));
        assert!(!rules.is_excluded("ccy", "USD"));
        assert!(!rules.is_excluded("region", "EUR"));
    }

    #[test]
    fn unit_exclusion_first_violation_reports_param_and_value() {
        let mut rules = ExclusionRules::new();
        rules.insert("ccy", ["EUR"]);
        let params = BTreeMap::from([
            ("book".to_string(), "B1".to_string()),
            ("ccy".to_string(), "EUR".to_string()),
        ]);
        assert_eq!(rules.first_violation(&params), Some(("ccy", "EUR")));
    }

    #[test]
    fn unit_response_body_decode_falls_back_to_text() {
        assert_eq!(
            ResponseBody::decode("{\"a\":1}"),
            ResponseBody::Json(json!({"a": 1}))
        );
        assert_eq!(
            ResponseBody::decode("<html>oops</html>"),
            ResponseBody::Text("<html>oops</html>".to_string())
        );
    }

    #[test]
    fn unit_fetch_result_record_error_joins_sides() {
        let mut result = FetchResult::pending(&sample_case());
        result.record_error(Side::Source, "request timed out");
        result.record_error(Side::Target, "connection refused");
        assert_eq!(
            result.error.as_deref(),
            Some("source: request timed out; target: connection refused")
        );
    }

    #[test]
    fn functional_run_dump_serializes_and_restores() {
        let case = sample_case();
        let mut result = FetchResult::pending(&case);
        result.source_status = Some(200);
        result.source_body = Some(ResponseBody::Json(json!({"px": 1.5})));
        result.target_body = Some(ResponseBody::Text("gateway error".to_string()));
        let dump = RunDump {
            generated_at: Utc::now(),
            test_cases: vec![case],
            results: vec![result],
        };
        let raw = serde_json::to_string(&dump).expect("serialize dump");
        let restored: RunDump = serde_json::from_str(&raw).expect("deserialize dump");
        assert_eq!(restored, dump);
    }
}
