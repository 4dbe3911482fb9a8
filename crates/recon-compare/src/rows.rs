use std::collections::HashMap;

use recon_core::truncate_chars;
use recon_types::{ComparisonRow, FetchResult, MatchStatus, ResponseBody, TestCase};

use crate::{compare_bodies, MISSING_OR_INVALID_JSON};

/// Characters of each body kept in the snapshot columns of mismatch rows.
pub const SNAPSHOT_CHARS: usize = 100;

/// Joins cases with their results by test id and classifies each pair.
///
/// Rows follow `cases` order. A case without a result still gets a
/// `NotMatch` row; results without a case are appended at the end.
pub fn compare_results(cases: &[TestCase], results: &[FetchResult]) -> Vec<ComparisonRow> {
    let mut by_id: HashMap<&str, &FetchResult> = HashMap::with_capacity(results.len());
    for result in results {
        if by_id.insert(result.test_id.as_str(), result).is_some() {
            tracing::warn!(test_id = %result.test_id, "duplicate fetch result; keeping the last one");
        }
    }

    let mut rows = Vec::with_capacity(cases.len());
    for case in cases {
        let row = match by_id.remove(case.id.as_str()) {
            Some(result) => compare_pair(case, result),
            None => missing_result_row(case),
        };
        rows.push(row);
    }

    let mut orphans: Vec<&FetchResult> = by_id.into_values().collect();
    orphans.sort_by(|left, right| left.test_id.cmp(&right.test_id));
    for result in orphans {
        tracing::warn!(test_id = %result.test_id, "fetch result has no matching test case");
        let case = TestCase {
            id: result.test_id.clone(),
            tag: String::new(),
            endpoint: result.endpoint.clone(),
            source_url: String::new(),
            target_url: String::new(),
            resolved_params: result.params.clone(),
            source_row: 0,
        };
        rows.push(compare_pair(&case, result));
    }

    let matched = rows
        .iter()
        .filter(|row| row.status == MatchStatus::Match)
        .count();
    tracing::info!(
        rows = rows.len(),
        matched,
        not_matched = rows.len() - matched,
        "comparison finished"
    );
    rows
}

/// Compares one fetched pair.
pub fn compare_pair(case: &TestCase, result: &FetchResult) -> ComparisonRow {
    let comparison = compare_bodies(result.source_body.as_ref(), result.target_body.as_ref());
    let mismatch = comparison.status == MatchStatus::NotMatch;
    ComparisonRow {
        test_id: case.id.clone(),
        tag: case.tag.clone(),
        endpoint: case.endpoint.clone(),
        source_url: case.source_url.clone(),
        target_url: case.target_url.clone(),
        source_status: result.source_status,
        target_status: result.target_status,
        status: comparison.status,
        diff_detail: comparison.detail,
        error: result.error.clone(),
        source_snapshot: snapshot(mismatch, result.source_body.as_ref()),
        target_snapshot: snapshot(mismatch, result.target_body.as_ref()),
    }
}

fn missing_result_row(case: &TestCase) -> ComparisonRow {
    ComparisonRow {
        test_id: case.id.clone(),
        tag: case.tag.clone(),
        endpoint: case.endpoint.clone(),
        source_url: case.source_url.clone(),
        target_url: case.target_url.clone(),
        source_status: None,
        target_status: None,
        status: MatchStatus::NotMatch,
        diff_detail: format!("{MISSING_OR_INVALID_JSON}: no fetch result recorded"),
        error: Some("no fetch result recorded".to_string()),
        source_snapshot: String::new(),
        target_snapshot: String::new(),
    }
}

fn snapshot(mismatch: bool, body: Option<&ResponseBody>) -> String {
    match body {
        Some(body) if mismatch => truncate_chars(&body.render(), SNAPSHOT_CHARS),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use recon_types::{FetchResult, MatchStatus, ResponseBody, TestCase};
    use serde_json::json;

    use super::{compare_results, SNAPSHOT_CHARS};

    fn case(id: &str) -> TestCase {
        TestCase {
            id: id.to_string(),
            tag: "Pricing".to_string(),
            endpoint: "/v1/price/{ccy}".to_string(),
            source_url: format!("https://source/{id}"),
            target_url: format!("https://target/{id}"),
            resolved_params: BTreeMap::new(),
            source_row: 2,
        }
    }

    fn result(id: &str, source: Option<ResponseBody>, target: Option<ResponseBody>) -> FetchResult {
        let mut result = FetchResult::pending(&case(id));
        result.source_status = source.as_ref().map(|_| 200);
        result.target_status = target.as_ref().map(|_| 200);
        result.source_body = source;
        result.target_body = target;
        result
    }

    #[test]
    fn functional_rows_follow_case_order_regardless_of_completion_order() {
        let cases = vec![case("Pricing_001"), case("Pricing_002")];
        let body = || Some(ResponseBody::Json(json!({ "ok": true })));
        let results = vec![
            result("Pricing_002", body(), body()),
            result("Pricing_001", body(), body()),
        ];

        let rows = compare_results(&cases, &results);
        let ids: Vec<&str> = rows.iter().map(|row| row.test_id.as_str()).collect();
        assert_eq!(ids, vec!["Pricing_001", "Pricing_002"]);
        assert!(rows.iter().all(|row| row.status == MatchStatus::Match));
        assert!(rows.iter().all(|row| row.source_snapshot.is_empty()));
    }

    #[test]
    fn functional_case_without_result_is_not_match() {
        let rows = compare_results(&[case("Pricing_001")], &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, MatchStatus::NotMatch);
        assert!(rows[0].diff_detail.starts_with("Missing or invalid JSON"));
        assert_eq!(rows[0].source_url, "https://source/Pricing_001");
    }

    #[test]
    fn functional_mismatch_rows_carry_truncated_snapshots_and_errors() {
        let long = "x".repeat(500);
        let mut failed = result(
            "Pricing_001",
            Some(ResponseBody::Json(json!({ "blob": long }))),
            None,
        );
        failed.record_error(recon_types::Side::Target, "request timed out");

        let rows = compare_results(&[case("Pricing_001")], &[failed]);
        let row = &rows[0];
        assert_eq!(row.status, MatchStatus::NotMatch);
        assert_eq!(row.error.as_deref(), Some("target: request timed out"));
        assert_eq!(row.source_snapshot.chars().count(), SNAPSHOT_CHARS);
        assert!(row.source_snapshot.ends_with("..."));
        assert!(row.target_snapshot.is_empty());
        assert_eq!(row.source_status, Some(200));
        assert_eq!(row.target_status, None);
    }

    #[test]
    fn regression_status_codes_do_not_change_classification() {
        let mut differing = result(
            "Pricing_001",
            Some(ResponseBody::Json(json!({ "a": 1 }))),
            Some(ResponseBody::Json(json!({ "a": 1 }))),
        );
        differing.target_status = Some(503);
        let rows = compare_results(&[case("Pricing_001")], &[differing]);
        assert_eq!(rows[0].status, MatchStatus::Match);
        assert_eq!(rows[0].target_status, Some(503));
    }

    #[test]
    fn unit_orphan_results_are_reported_after_cases() {
        let body = || Some(ResponseBody::Text("same".to_string()));
        let rows = compare_results(
            &[case("Pricing_001")],
            &[
                result("Pricing_001", body(), body()),
                result("Stray_001", body(), body()),
            ],
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].test_id, "Stray_001");
        assert_eq!(rows[1].status, MatchStatus::Match);
    }
}
