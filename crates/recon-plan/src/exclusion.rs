use std::path::Path;

use recon_types::ExclusionRules;

use crate::cells::parse_cell_values;
use crate::table::{read_table, Table};
use crate::InputError;

/// Builds exclusion rules from a table with `Parameter` and `Values` columns.
/// Repeated parameters accumulate.
pub fn exclusions_from_table(path: &Path, table: &Table) -> Result<ExclusionRules, InputError> {
    for column in ["Parameter", "Values"] {
        if !table.has_column(column) {
            return Err(InputError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }
    let mut rules = ExclusionRules::new();
    for row in table.rows() {
        let Some(param) = row.get("parameter") else {
            tracing::debug!(row = row.number, "exclusion row without parameter name ignored");
            continue;
        };
        rules.insert(param, parse_cell_values(row.get("values").unwrap_or_default()));
    }
    Ok(rules)
}

/// Loads the exclusion blacklist file.
pub fn load_exclusions(path: &Path) -> Result<ExclusionRules, InputError> {
    let table = read_table(path, None)?;
    let rules = exclusions_from_table(path, &table)?;
    tracing::info!(
        excluded_values = rules.len(),
        "loaded exclusion rules from {}",
        path.display()
    );
    Ok(rules)
}
