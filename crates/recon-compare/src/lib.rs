//! Comparison of paired responses and the spreadsheet report.
//!
//! Bodies are compared structurally with array order ignored at every depth.
//! Each test case yields exactly one [`recon_types::ComparisonRow`], including
//! cases whose fetch produced nothing.

mod diff;
mod dump;
mod error;
mod report;
mod rows;
mod workbook;

pub use diff::*;
pub use dump::*;
pub use error::ReportError;
pub use report::*;
pub use rows::*;
pub use workbook::*;
