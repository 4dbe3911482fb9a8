use std::path::Path;

use chrono::Utc;
use recon_core::write_text_atomic;
use recon_types::{FetchResult, RunDump, TestCase};

use crate::ReportError;

/// Captures a run for offline re-comparison.
pub fn build_run_dump(test_cases: &[TestCase], results: &[FetchResult]) -> RunDump {
    RunDump {
        generated_at: Utc::now(),
        test_cases: test_cases.to_vec(),
        results: results.to_vec(),
    }
}

/// Writes the dump as pretty JSON, atomically.
pub fn write_run_dump(path: &Path, dump: &RunDump) -> Result<(), ReportError> {
    let mut payload = serde_json::to_string_pretty(dump).map_err(ReportError::Encode)?;
    payload.push('\n');
    write_text_atomic(path, &payload).map_err(|error| ReportError::Write {
        path: path.to_path_buf(),
        message: format!("{error:#}"),
    })?;
    tracing::info!(
        path = %path.display(),
        test_cases = dump.test_cases.len(),
        results = dump.results.len(),
        "wrote run dump"
    );
    Ok(())
}

pub fn load_run_dump(path: &Path) -> Result<RunDump, ReportError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ReportError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
