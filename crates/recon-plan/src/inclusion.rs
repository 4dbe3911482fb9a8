use std::collections::BTreeMap;
use std::path::Path;

use recon_core::clean_text;
use recon_types::EndpointSpec;

use crate::cells::{normalize_column_name, parse_cell_values};
use crate::table::{read_table, Table};
use crate::InputError;

const FIXED_COLUMNS: [&str; 3] = ["tag", "method", "endpoint"];

/// Bookkeeping columns that never carry parameter values.
const RESERVED_COLUMNS: [&str; 6] = [
    "comments",
    "comment",
    "description",
    "sourcebaseurl",
    "targetbaseurl",
    "testcaseid",
];

/// Headers treated as parameter columns: everything except the fixed and reserved ones.
pub fn parameter_columns(table: &Table) -> Vec<(usize, String)> {
    table
        .headers()
        .iter()
        .enumerate()
        .filter_map(|(position, header)| {
            let name = clean_text(header);
            let normalized = normalize_column_name(&name);
            if normalized.is_empty()
                || FIXED_COLUMNS.contains(&normalized.as_str())
                || RESERVED_COLUMNS.contains(&normalized.as_str())
            {
                return None;
            }
            Some((position, name))
        })
        .collect()
}

/// Converts an inclusion table into endpoint specs, one per non-blank row.
pub fn inclusion_specs_from_table(
    path: &Path,
    table: &Table,
) -> Result<Vec<EndpointSpec>, InputError> {
    for column in FIXED_COLUMNS {
        if !table.has_column(column) {
            return Err(InputError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }
    let params = parameter_columns(table);
    let specs = table
        .rows()
        .map(|row| {
            let allowed_param_values = params
                .iter()
                .map(|(position, name)| {
                    let values = row.cell(*position).map(parse_cell_values).unwrap_or_default();
                    (name.clone(), values)
                })
                .collect::<BTreeMap<_, _>>();
            EndpointSpec {
                tag: clean_text(row.get("tag").unwrap_or_default()),
                method: clean_text(row.get("method").unwrap_or_default()).to_ascii_uppercase(),
                endpoint_template: clean_text(row.get("endpoint").unwrap_or_default()),
                allowed_param_values,
                row: row.number,
            }
        })
        .collect();
    Ok(specs)
}

/// Loads the inclusion criteria file (first sheet, or `sheet`).
pub fn load_inclusion_specs(
    path: &Path,
    sheet: Option<&str>,
) -> Result<Vec<EndpointSpec>, InputError> {
    let table = read_table(path, sheet)?;
    let specs = inclusion_specs_from_table(path, &table)?;
    tracing::info!(
        rows = specs.len(),
        parameter_columns = parameter_columns(&table).len(),
        "loaded inclusion criteria from {}",
        path.display()
    );
    Ok(specs)
}
