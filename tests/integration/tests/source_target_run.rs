use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use calamine::{open_workbook_auto, Data, Reader};
use httpmock::prelude::*;
use recon_cli::{build_plan, execute_compare, execute_run, PlanArgs, RunOutputs};
use recon_config::Credentials;
use recon_fetch::{FetcherConfig, ReqwestTransport, TransportConfig};
use rust_xlsxwriter::Workbook;
use serde_json::json;
use tempfile::{tempdir, TempDir};

const BASIC_AUTH: &str = "Basic c3ZjOnMzY3JldA==";

fn write_sheet(workbook: &mut Workbook, name: &str, rows: &[&[&str]]) {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name).expect("sheet name");
    for (row_index, row) in rows.iter().enumerate() {
        for (column, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet
                    .write_string(row_index as u32, column as u16, *value)
                    .expect("write cell");
            }
        }
    }
}

fn write_inputs(dir: &Path, source_base: &str, target_base: &str) -> PlanArgs {
    let inclusion = dir.join("inclusion.xlsx");
    let mut workbook = Workbook::new();
    write_sheet(
        &mut workbook,
        "Criteria",
        &[
            &["Tag", "Method", "Endpoint", "CCY", "Book", "Comments"],
            &["Pricing", "GET", "/v1/price/{ccy}", "USD, EUR, JPY", "", "fx"],
            &["Risk", "get", "/v1/risk/{book}", "", "B1", ""],
            &["Pricing", "GET", "/v1/legacy", "", "", "source only"],
        ],
    );
    workbook.save(&inclusion).expect("save inclusion");

    let endpoints = dir.join("endpoints.xlsx");
    let mut workbook = Workbook::new();
    let header: &[&str] = &["tag", "method", "endpoint"];
    write_sheet(
        &mut workbook,
        "SOURCE",
        &[
            header,
            &["Pricing", "GET", "/v1/price/{ccy}"],
            &["Risk", "GET", "/v1/risk/{book}"],
            &["Pricing", "GET", "/v1/legacy"],
        ],
    );
    write_sheet(
        &mut workbook,
        "TARGET",
        &[
            header,
            &["Pricing", "GET", "/v1/price/{ccy}"],
            &["Risk", "GET", "/v1/risk/{book}"],
        ],
    );
    workbook.save(&endpoints).expect("save endpoints");

    let exclusion = dir.join("exclusion.csv");
    std::fs::write(&exclusion, "Parameter,Values\nccy,JPY\n").expect("write exclusion");

    let config = dir.join("ApiTestData.json");
    std::fs::write(
        &config,
        json!({
            "System": "PL",
            "Region": "LDN",
            "Env_Source": "UAT",
            "Env_Target": "PROD",
            "TestData": { "default": { "reportingDate": "2024-03-28" } }
        })
        .to_string(),
    )
    .expect("write config");

    PlanArgs {
        inclusion,
        inclusion_sheet: Some("Criteria".to_string()),
        config,
        exclusion: vec![exclusion],
        endpoints: Some(endpoints),
        env_file: None,
        source_base_url: Some(source_base.to_string()),
        target_base_url: Some(target_base.to_string()),
    }
}

fn report_rows(path: &Path) -> Vec<BTreeMap<String, String>> {
    let mut workbook = open_workbook_auto(path).expect("open report");
    let range = workbook.worksheet_range("Comparison").expect("comparison sheet");
    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .expect("header")
        .iter()
        .map(ToString::to_string)
        .collect();
    rows.map(|row| {
        header
            .iter()
            .cloned()
            .zip(row.iter().map(|cell| match cell {
                Data::Empty => String::new(),
                other => other.to_string(),
            }))
            .collect()
    })
    .collect()
}

fn workspace() -> (TempDir, PathBuf) {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().to_path_buf();
    (temp, root)
}

#[tokio::test]
async fn integration_full_run_against_mock_source_and_target() {
    let source = MockServer::start();
    let target = MockServer::start();

    let source_usd = source.mock(|when, then| {
        when.method(GET)
            .path("/v1/price/USD")
            .header("authorization", BASIC_AUTH);
        then.status(200).json_body(json!({ "a": [1, 2], "ccy": "USD" }));
    });
    let target_usd = target.mock(|when, then| {
        when.method(GET)
            .path("/v1/price/USD")
            .header("authorization", BASIC_AUTH);
        then.status(200).json_body(json!({ "ccy": "USD", "a": [2, 1] }));
    });
    source.mock(|when, then| {
        when.method(GET).path("/v1/price/EUR");
        then.status(200).json_body(json!({ "px": 1.1 }));
    });
    target.mock(|when, then| {
        when.method(GET).path("/v1/price/EUR");
        then.status(200).json_body(json!({ "px": 1.2 }));
    });
    source.mock(|when, then| {
        when.method(GET).path("/v1/risk/B1");
        then.status(200).json_body(json!({ "book": "B1" }));
    });
    target.mock(|when, then| {
        when.method(GET).path("/v1/risk/B1");
        then.status(503).body("service unavailable");
    });
    let excluded = source.mock(|when, then| {
        when.method(GET).path("/v1/price/JPY");
        then.status(200).body("{}");
    });

    let (_temp, root) = workspace();
    let args = write_inputs(&root, &source.base_url(), &target.base_url());
    let plan = build_plan(&args, |_| None).expect("plan");

    let ids: Vec<&str> = plan
        .generation
        .cases
        .iter()
        .map(|case| case.id.as_str())
        .collect();
    assert_eq!(ids, vec!["Pricing_001", "Pricing_002", "Risk_001"]);
    assert_eq!(plan.generation.skip_counts().get("excluded_value"), Some(&1));
    assert_eq!(plan.generation.skip_counts().get("not_in_catalog"), Some(&1));

    let transport = ReqwestTransport::new(TransportConfig {
        timeout: Duration::from_secs(5),
        credentials: Some(Credentials {
            username: "svc".to_string(),
            secret: "s3cret".to_string(),
        }),
        ..TransportConfig::default()
    })
    .expect("transport");
    let outputs = RunOutputs {
        report: root.join("reports").join("comparison.xlsx"),
        dump: Some(root.join("reports").join("run.json")),
    };
    let responses_dir = root.join("responses");
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let summary = execute_run(
        &plan,
        Arc::new(transport),
        FetcherConfig {
            max_in_flight: 2,
            responses_dir: Some(responses_dir.clone()),
        },
        &outputs,
        shutdown_rx,
    )
    .await
    .expect("run");

    assert_eq!(summary.total, 3);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.not_matched, 2);
    assert_eq!(summary.transport_errors, 0);
    source_usd.assert();
    target_usd.assert();
    excluded.assert_calls(0);

    let rows = report_rows(&outputs.report);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["TestCaseID"], "Pricing_001");
    assert_eq!(rows[0]["ComparisonResult"], "Match");
    assert_eq!(rows[0]["SourceSnapshot"], "");
    assert_eq!(rows[1]["ComparisonResult"], "NotMatch");
    assert!(rows[1]["Comments"].contains("changed $.px"), "{}", rows[1]["Comments"]);
    assert_eq!(rows[2]["TestCaseID"], "Risk_001");
    assert_eq!(rows[2]["TargetStatus"], "503");
    assert!(rows[2]["Comments"].starts_with("Missing or invalid JSON"));
    assert_eq!(rows[2]["TargetSnapshot"], "service unavailable");

    let saved = std::fs::read_to_string(responses_dir.join("Risk_001_TARGET.json"))
        .expect("saved target body");
    assert_eq!(saved, "service unavailable");

    let replay = root.join("reports").join("replay.xlsx");
    let replayed = execute_compare(outputs.dump.as_deref().expect("dump"), &replay)
        .expect("offline compare");
    assert_eq!(replayed, summary);
}

#[tokio::test]
async fn integration_unreachable_target_is_reported_not_fatal() {
    let source = MockServer::start();
    source.mock(|when, then| {
        when.method(GET).path_prefix("/v1/");
        then.status(200).json_body(json!({ "ok": true }));
    });

    let (_temp, root) = workspace();
    let args = write_inputs(&root, &source.base_url(), "http://127.0.0.1:9");
    let plan = build_plan(&args, |_| None).expect("plan");
    let transport = ReqwestTransport::new(TransportConfig {
        timeout: Duration::from_secs(2),
        ..TransportConfig::default()
    })
    .expect("transport");
    let outputs = RunOutputs {
        report: root.join("report.xlsx"),
        dump: None,
    };
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let summary = execute_run(
        &plan,
        Arc::new(transport),
        FetcherConfig::default(),
        &outputs,
        shutdown_rx,
    )
    .await
    .expect("run still produces a report");

    assert_eq!(summary.total, 3);
    assert_eq!(summary.not_matched, 3);
    assert_eq!(summary.transport_errors, 3);
    let rows = report_rows(&outputs.report);
    for row in &rows {
        assert!(row["Error"].starts_with("target: "), "{}", row["Error"]);
        assert_eq!(row["SourceStatus"], "200");
        assert!(row["Comments"].contains("target body missing"));
    }
}
