use std::path::Path;

use recon_core::{truncate_chars, write_bytes_atomic};
use recon_types::TestCase;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::ReportError;

/// Excel rejects longer strings in a single cell.
pub const MAX_CELL_CHARS: usize = 32_767;

pub const TEST_CASES_SHEET: &str = "TestCases";
pub const SKIPPED_SHEET: &str = "Skipped";

pub const TEST_CASE_COLUMNS: [&str; 7] = [
    "TestCaseID",
    "TagName",
    "SourceBaseURL",
    "TargetBaseURL",
    "SourceRequestURL",
    "TargetRequestURL",
    "Comments",
];

const SKIPPED_COLUMNS: [&str; 5] = ["Row", "TagName", "Endpoint", "Reason", "Detail"];

/// An inclusion row or combination that produced no test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub row: usize,
    pub tag: String,
    pub endpoint: String,
    pub reason: String,
    pub detail: String,
}

/// Writes the `generate` workbook: one row per test case, plus a `Skipped`
/// sheet when anything was dropped.
pub fn write_test_case_workbook(
    path: &Path,
    cases: &[TestCase],
    source_base_url: &str,
    target_base_url: &str,
    skipped: &[SkippedEntry],
) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let header = header_format();

    let sheet = workbook.add_worksheet();
    sheet.set_name(TEST_CASES_SHEET)?;
    write_header(sheet, &TEST_CASE_COLUMNS, &header)?;
    for (index, case) in cases.iter().enumerate() {
        let row = sheet_row(index)?;
        let comment = format!("Generated from inclusion row {}", case.source_row);
        let values = [
            case.id.as_str(),
            case.tag.as_str(),
            source_base_url,
            target_base_url,
            case.source_url.as_str(),
            case.target_url.as_str(),
            comment.as_str(),
        ];
        for (column, value) in values.into_iter().enumerate() {
            write_text(sheet, row, column, value)?;
        }
    }
    let widths = [14.0, 14.0, 32.0, 32.0, 60.0, 60.0, 32.0];
    for (column, width) in widths.into_iter().enumerate() {
        sheet.set_column_width(sheet_column(column), width)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    if !skipped.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SKIPPED_SHEET)?;
        write_header(sheet, &SKIPPED_COLUMNS, &header)?;
        for (index, entry) in skipped.iter().enumerate() {
            let row = sheet_row(index)?;
            sheet.write_number(row, 0, entry.row as f64)?;
            write_text(sheet, row, 1, &entry.tag)?;
            write_text(sheet, row, 2, &entry.endpoint)?;
            write_text(sheet, row, 3, &entry.reason)?;
            write_text(sheet, row, 4, &entry.detail)?;
        }
    }

    save_workbook(&mut workbook, path)?;
    tracing::info!(
        path = %path.display(),
        test_cases = cases.len(),
        skipped = skipped.len(),
        "wrote test case workbook"
    );
    Ok(())
}

pub(crate) fn header_format() -> Format {
    Format::new().set_bold()
}

pub(crate) fn write_header(
    sheet: &mut Worksheet,
    columns: &[&str],
    format: &Format,
) -> Result<(), XlsxError> {
    for (column, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, sheet_column(column), *name, format)?;
    }
    Ok(())
}

/// Writes a string cell, truncated to the Excel cell limit. Empty values leave
/// the cell blank.
pub(crate) fn write_text(
    sheet: &mut Worksheet,
    row: u32,
    column: usize,
    value: &str,
) -> Result<(), XlsxError> {
    if value.is_empty() {
        return Ok(());
    }
    sheet.write_string(row, sheet_column(column), truncate_chars(value, MAX_CELL_CHARS))?;
    Ok(())
}

/// Like [`write_text`], but always applies `format`; empty values become a
/// formatted blank cell.
pub(crate) fn write_text_with_format(
    sheet: &mut Worksheet,
    row: u32,
    column: usize,
    value: &str,
    format: &Format,
) -> Result<(), XlsxError> {
    let column = sheet_column(column);
    if value.is_empty() {
        sheet.write_blank(row, column, format)?;
    } else {
        sheet.write_string_with_format(row, column, truncate_chars(value, MAX_CELL_CHARS), format)?;
    }
    Ok(())
}

/// Data rows start below the header.
pub(crate) fn sheet_row(index: usize) -> Result<u32, XlsxError> {
    u32::try_from(index + 1).map_err(|_| XlsxError::RowColumnLimitError)
}

pub(crate) fn sheet_column(column: usize) -> u16 {
    u16::try_from(column).unwrap_or(u16::MAX)
}

pub(crate) fn save_workbook(workbook: &mut Workbook, path: &Path) -> Result<(), ReportError> {
    let buffer = workbook.save_to_buffer()?;
    write_bytes_atomic(path, &buffer).map_err(|error| ReportError::Write {
        path: path.to_path_buf(),
        message: format!("{error:#}"),
    })
}
