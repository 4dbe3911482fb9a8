use std::collections::BTreeSet;
use std::path::Path;

use recon_core::clean_text;
use recon_types::EndpointKey;

use crate::table::{read_workbook_sheets, Table};
use crate::InputError;

/// Sheet holding the source environment's endpoint listing.
pub const SOURCE_SHEET: &str = "SOURCE";
/// Sheet holding the target environment's endpoint listing.
pub const TARGET_SHEET: &str = "TARGET";

/// Endpoints known to exist on both environments.
///
/// An open catalog accepts every key; it is used when no listing was supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointCatalog {
    known: Option<BTreeSet<EndpointKey>>,
}

impl EndpointCatalog {
    pub fn open() -> Self {
        Self { known: None }
    }

    /// Intersection of the two listings on `(tag, method, endpoint)`.
    pub fn from_listings<S, T>(source: S, target: T) -> Self
    where
        S: IntoIterator<Item = EndpointKey>,
        T: IntoIterator<Item = EndpointKey>,
    {
        let source: BTreeSet<EndpointKey> = source.into_iter().collect();
        let known = target
            .into_iter()
            .filter(|key| source.contains(key))
            .collect();
        Self { known: Some(known) }
    }

    /// Builds the catalog from two listing tables with `tag`, `method`, `endpoint` columns.
    pub fn from_tables(path: &Path, source: &Table, target: &Table) -> Result<Self, InputError> {
        Ok(Self::from_listings(
            listing_keys(path, source)?,
            listing_keys(path, target)?,
        ))
    }

    pub fn contains(&self, key: &EndpointKey) -> bool {
        match &self.known {
            Some(known) => known.contains(key),
            None => true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.known.is_none()
    }

    /// Number of shared endpoints; `None` for an open catalog.
    pub fn len(&self) -> Option<usize> {
        self.known.as_ref().map(BTreeSet::len)
    }
}

fn listing_keys(path: &Path, table: &Table) -> Result<Vec<EndpointKey>, InputError> {
    for column in ["tag", "method", "endpoint"] {
        if !table.has_column(column) {
            return Err(InputError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }
    Ok(table
        .rows()
        .filter_map(|row| {
            let endpoint = clean_text(row.get("endpoint")?);
            let tag = clean_text(row.get("tag").unwrap_or_default());
            let method = clean_text(row.get("method").unwrap_or_default());
            Some(EndpointKey::new(&tag, &method, &endpoint))
        })
        .collect())
}

/// Loads the scraped endpoint listing workbook (`SOURCE` and `TARGET` sheets).
pub fn load_endpoint_catalog(path: &Path) -> Result<EndpointCatalog, InputError> {
    let mut tables = read_workbook_sheets(path, &[SOURCE_SHEET, TARGET_SHEET])?.into_iter();
    let (Some(source), Some(target)) = (tables.next(), tables.next()) else {
        return Err(InputError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: TARGET_SHEET.to_string(),
        });
    };
    let catalog = EndpointCatalog::from_tables(path, &source, &target)?;
    tracing::info!(
        source_endpoints = source.len(),
        target_endpoints = target.len(),
        shared_endpoints = catalog.len().unwrap_or_default(),
        "loaded endpoint catalog from {}",
        path.display()
    );
    Ok(catalog)
}
