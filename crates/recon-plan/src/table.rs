//! Tabular input loading.
//!
//! Spreadsheets are read into a [`Table`]: a header row plus string cells.
//! Column lookups go through [`normalize_column_name`] once, at construction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;

use crate::cells::{is_blank_cell, normalize_column_name};
use crate::InputError;

/// Header plus string rows of one sheet or csv file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut index = HashMap::new();
        for (position, header) in headers.iter().enumerate() {
            let normalized = normalize_column_name(header);
            if normalized.is_empty() {
                continue;
            }
            index.entry(normalized).or_insert(position);
        }
        Self {
            headers,
            rows,
            index,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column position for `name`, matched after normalization.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(&normalize_column_name(name)).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Data rows, skipping rows whose cells are all blank.
    pub fn rows(&self) -> impl Iterator<Item = TableRow<'_>> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, cells)| !cells.iter().all(|cell| is_blank_cell(cell)))
            .map(|(position, cells)| TableRow {
                table: self,
                cells,
                number: position + 2,
            })
    }
}

/// One data row; `number` is the spreadsheet row number (header is row 1).
#[derive(Debug, Clone, Copy)]
pub struct TableRow<'a> {
    table: &'a Table,
    cells: &'a [String],
    pub number: usize,
}

impl<'a> TableRow<'a> {
    /// Raw cell text for the column, `None` when the column is absent or the cell is blank.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let position = self.table.column_index(column)?;
        self.cell(position)
    }

    /// Raw cell text at `position`, `None` when blank.
    pub fn cell(&self, position: usize) -> Option<&'a str> {
        self.cells
            .get(position)
            .map(String::as_str)
            .filter(|cell| !is_blank_cell(cell))
    }
}

/// Reads a table from a workbook (first sheet, or `sheet`) or a csv file.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound {
            path: path.to_path_buf(),
        });
    }
    match input_format(path) {
        Some(InputFormat::Workbook) => read_workbook_sheet(path, sheet),
        Some(InputFormat::Csv) => {
            if sheet.is_some() {
                return Err(InputError::SheetNotSupported {
                    path: path.to_path_buf(),
                });
            }
            read_csv(path)
        }
        None => Err(InputError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Reads several named sheets of one workbook; sheet names match case-insensitively.
pub fn read_workbook_sheets(path: &Path, sheets: &[&str]) -> Result<Vec<Table>, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if input_format(path) != Some(InputFormat::Workbook) {
        return Err(InputError::SheetNotSupported {
            path: path.to_path_buf(),
        });
    }
    let mut workbook = open_workbook_auto(path).map_err(|source| workbook_error(path, source))?;
    let names = workbook.sheet_names();
    sheets
        .iter()
        .map(|wanted| {
            let name = find_sheet(&names, wanted).ok_or_else(|| InputError::SheetNotFound {
                path: path.to_path_buf(),
                sheet: wanted.to_string(),
            })?;
            let range = workbook
                .worksheet_range(&name)
                .map_err(|source| workbook_error(path, source))?;
            Ok(table_from_rows(range.rows()))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Workbook,
    Csv,
}

fn input_format(path: &Path) -> Option<InputFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(InputFormat::Workbook),
        "csv" => Some(InputFormat::Csv),
        _ => None,
    }
}

fn workbook_error(path: &Path, source: calamine::Error) -> InputError {
    InputError::Workbook {
        path: path.to_path_buf(),
        source,
    }
}

fn find_sheet(names: &[String], wanted: &str) -> Option<String> {
    names
        .iter()
        .find(|name| name.as_str() == wanted)
        .or_else(|| {
            names
                .iter()
                .find(|name| name.trim().eq_ignore_ascii_case(wanted.trim()))
        })
        .cloned()
}

fn read_workbook_sheet(path: &Path, sheet: Option<&str>) -> Result<Table, InputError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| workbook_error(path, source))?;
    let names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) => find_sheet(&names, wanted).ok_or_else(|| InputError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: wanted.to_string(),
        })?,
        None => names.first().cloned().ok_or_else(|| InputError::EmptyWorkbook {
            path: path.to_path_buf(),
        })?,
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| workbook_error(path, source))?;
    let table = table_from_rows(range.rows());
    if table.is_empty() {
        tracing::warn!(sheet = %name, "sheet in {} has no data rows", path.display());
    } else {
        tracing::debug!(
            sheet = %name,
            rows = table.len(),
            "loaded sheet from {}",
            path.display()
        );
    }
    Ok(table)
}

fn table_from_rows<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> Table {
    let headers = rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();
    let body = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    Table::new(headers, body)
}

fn read_csv(path: &Path) -> Result<Table, InputError> {
    let csv_error = |source: csv::Error| InputError::Csv {
        path: PathBuf::from(path),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let headers = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|header| header.trim_start_matches('\u{FEFF}').to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    tracing::debug!(rows = rows.len(), "loaded csv {}", path.display());
    Ok(Table::new(headers, rows))
}

/// Renders a workbook cell the way a user reads it: integral floats without `.0`, dates as ISO.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) => format_float(*value),
        Data::Bool(flag) => flag.to_string(),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) if datetime.num_seconds_from_midnight() == 0 => {
                datetime.format("%Y-%m-%d").to_string()
            }
            Some(datetime) => datetime.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => format_float(value.as_f64()),
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => text.clone(),
        Data::Error(error) => error.to_string(),
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
