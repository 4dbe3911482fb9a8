use std::path::{Path, PathBuf};

use recon_core::write_text_atomic;
use recon_types::{FetchResult, Side};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to write response file {path}: {message}")]
pub struct ResponseWriteError {
    pub path: PathBuf,
    pub message: String,
}

/// Path of the saved body for one side, e.g. `Pricing_001_SOURCE.json`.
pub fn response_file_path(dir: &Path, test_id: &str, side: Side) -> PathBuf {
    dir.join(format!(
        "{}_{}.json",
        sanitize_file_stem(test_id),
        side.file_label()
    ))
}

/// Escapes every byte outside `[A-Za-z0-9_.-]` as `~XX`, so distinct ids
/// never share a file.
fn sanitize_file_stem(raw: &str) -> String {
    let mut stem = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'-' | b'.') {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("~{byte:02X}"));
        }
    }
    stem
}

/// Writes whichever bodies `result` holds. Returns the paths written.
pub fn save_response_bodies(
    dir: &Path,
    result: &FetchResult,
) -> Result<Vec<PathBuf>, ResponseWriteError> {
    let mut written = Vec::new();
    for (side, body) in [
        (Side::Source, &result.source_body),
        (Side::Target, &result.target_body),
    ] {
        let Some(body) = body else {
            continue;
        };
        let path = response_file_path(dir, &result.test_id, side);
        write_text_atomic(&path, &body.render()).map_err(|error| ResponseWriteError {
            path: path.clone(),
            message: format!("{error:#}"),
        })?;
        written.push(path);
    }
    Ok(written)
}
