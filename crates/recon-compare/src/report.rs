use std::path::Path;

use recon_types::{ComparisonRow, MatchStatus};
use rust_xlsxwriter::{Color, Format, Workbook};

use crate::workbook::{
    header_format, save_workbook, sheet_column, sheet_row, write_header, write_text,
    write_text_with_format,
};
use crate::ReportError;

pub const COMPARISON_SHEET: &str = "Comparison";
pub const SUMMARY_SHEET: &str = "Summary";

pub const COMPARISON_COLUMNS: [&str; 12] = [
    "TestCaseID",
    "TagName",
    "Endpoint",
    "SourceRequestURL",
    "TargetRequestURL",
    "SourceStatus",
    "TargetStatus",
    "ComparisonResult",
    "Comments",
    "Error",
    "SourceSnapshot",
    "TargetSnapshot",
];

const SOURCE_SNAPSHOT_FILL: u32 = 0xFFFF99;
const TARGET_SNAPSHOT_FILL: u32 = 0xCCFFFF;

/// Totals shown on the `Summary` sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub matched: usize,
    pub not_matched: usize,
    pub transport_errors: usize,
}

impl ReportSummary {
    pub fn from_rows(rows: &[ComparisonRow]) -> Self {
        let matched = rows
            .iter()
            .filter(|row| row.status == MatchStatus::Match)
            .count();
        Self {
            total: rows.len(),
            matched,
            not_matched: rows.len() - matched,
            transport_errors: rows.iter().filter(|row| row.error.is_some()).count(),
        }
    }
}

/// Writes the comparison report and returns its totals.
///
/// Snapshot cells of `NotMatch` rows are filled so mismatches stand out when
/// scanning the sheet.
pub fn write_comparison_report(
    path: &Path,
    rows: &[ComparisonRow],
) -> Result<ReportSummary, ReportError> {
    let summary = ReportSummary::from_rows(rows);
    let mut workbook = Workbook::new();
    let header = header_format();
    let source_fill = Format::new().set_background_color(Color::RGB(SOURCE_SNAPSHOT_FILL));
    let target_fill = Format::new().set_background_color(Color::RGB(TARGET_SNAPSHOT_FILL));

    let sheet = workbook.add_worksheet();
    sheet.set_name(COMPARISON_SHEET)?;
    write_header(sheet, &COMPARISON_COLUMNS, &header)?;
    for (index, row) in rows.iter().enumerate() {
        let line = sheet_row(index)?;
        write_text(sheet, line, 0, &row.test_id)?;
        write_text(sheet, line, 1, &row.tag)?;
        write_text(sheet, line, 2, &row.endpoint)?;
        write_text(sheet, line, 3, &row.source_url)?;
        write_text(sheet, line, 4, &row.target_url)?;
        for (column, status) in [(5, row.source_status), (6, row.target_status)] {
            if let Some(status) = status {
                sheet.write_number(line, column, f64::from(status))?;
            }
        }
        write_text(sheet, line, 7, row.status.as_str())?;
        write_text(sheet, line, 8, &row.diff_detail)?;
        write_text(sheet, line, 9, row.error.as_deref().unwrap_or_default())?;
        if row.status == MatchStatus::NotMatch {
            write_text_with_format(sheet, line, 10, &row.source_snapshot, &source_fill)?;
            write_text_with_format(sheet, line, 11, &row.target_snapshot, &target_fill)?;
        } else {
            write_text(sheet, line, 10, &row.source_snapshot)?;
            write_text(sheet, line, 11, &row.target_snapshot)?;
        }
    }
    let widths = [
        14.0, 12.0, 36.0, 50.0, 50.0, 12.0, 12.0, 16.0, 60.0, 40.0, 40.0, 40.0,
    ];
    for (column, width) in widths.into_iter().enumerate() {
        sheet.set_column_width(sheet_column(column), width)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    if !rows.is_empty() {
        let last_row = sheet_row(rows.len() - 1)?;
        sheet.autofilter(0, 0, last_row, sheet_column(COMPARISON_COLUMNS.len() - 1))?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(SUMMARY_SHEET)?;
    write_header(sheet, &["Metric", "Count"], &header)?;
    let totals = [
        ("Total", summary.total),
        ("Matched", summary.matched),
        ("NotMatched", summary.not_matched),
        ("TransportErrors", summary.transport_errors),
    ];
    for (index, (label, count)) in totals.into_iter().enumerate() {
        let line = sheet_row(index)?;
        write_text(sheet, line, 0, label)?;
        sheet.write_number(line, 1, count as f64)?;
    }
    sheet.set_column_width(0, 18.0)?;

    save_workbook(&mut workbook, path)?;
    tracing::info!(
        path = %path.display(),
        total = summary.total,
        matched = summary.matched,
        not_matched = summary.not_matched,
        transport_errors = summary.transport_errors,
        "wrote comparison report"
    );
    Ok(summary)
}
