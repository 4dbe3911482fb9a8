use std::path::PathBuf;

use recon_types::EndpointKey;
use thiserror::Error;

/// Unreadable or structurally invalid planning inputs. Fatal for the run.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input file not found: {path}")]
    NotFound { path: PathBuf },
    #[error("unsupported input format for {path}: expected .xlsx, .xlsm, .xlsb, .xls, .ods or .csv")]
    UnsupportedFormat { path: PathBuf },
    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook {path} has no sheet named '{sheet}'")]
    SheetNotFound { path: PathBuf, sheet: String },
    #[error("workbook {path} contains no sheets")]
    EmptyWorkbook { path: PathBuf },
    #[error("sheet selection is only supported for workbooks, not {path}")]
    SheetNotSupported { path: PathBuf },
    #[error("failed to read csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },
}

/// Why an inclusion row, or one parameter combination of it, produced no test case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("row is missing its {0} value")]
    IncompleteRow(&'static str),
    #[error("{0} is not listed on both source and target")]
    NotInCatalog(EndpointKey),
    #[error("method {0} is not supported; only GET endpoints are compared")]
    UnsupportedMethod(String),
    #[error("no values supplied for parameter '{0}'")]
    MissingValues(String),
    #[error("parameter '{param}' resolved to excluded value '{value}'")]
    ExcludedValue { param: String, value: String },
    #[error("unresolved placeholder left in '{0}'")]
    UnresolvedPlaceholder(String),
}

impl SkipReason {
    /// Stable short code used for summary counts.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IncompleteRow(_) => "incomplete_row",
            Self::NotInCatalog(_) => "not_in_catalog",
            Self::UnsupportedMethod(_) => "unsupported_method",
            Self::MissingValues(_) => "missing_values",
            Self::ExcludedValue { .. } => "excluded_value",
            Self::UnresolvedPlaceholder(_) => "unresolved_placeholder",
        }
    }
}
