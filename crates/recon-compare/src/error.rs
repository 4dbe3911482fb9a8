use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
/// Failures producing or reading report artifacts. All are fatal for the run.
pub enum ReportError {
    #[error("failed to build workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode run dump: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed run dump {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
