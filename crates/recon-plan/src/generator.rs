//! Expansion of inclusion rows into concrete test cases.
//!
//! Rows are processed independently. The only state carried across rows is
//! the per-tag id counter, which the generator instance owns.

use std::collections::{BTreeMap, BTreeSet};

use recon_config::{BaseUrls, TestDataConfig};
use recon_core::clean_text;
use recon_types::{
    format_test_id, EndpointSpec, ExclusionRules, TestCase, REPORTING_DATE_PARAM,
};

use crate::catalog::EndpointCatalog;
use crate::cells::{
    extract_placeholders, has_unresolved_placeholder, normalize_column_name,
    substitute_placeholders,
};
use crate::SkipReason;

/// Per-tag sequence counters behind `<tag>_<seq>` ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCounters {
    counters: BTreeMap<String, u32>,
}

impl TagCounters {
    /// Advances the tag's counter and returns the formatted id.
    pub fn next_id(&mut self, tag: &str) -> String {
        let counter = self.counters.entry(tag.to_string()).or_insert(0);
        *counter += 1;
        format_test_id(tag, *counter)
    }
}

/// A row or combination that produced no test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSkip {
    pub row: usize,
    pub tag: String,
    pub endpoint: String,
    pub reason: SkipReason,
}

/// Generated cases in emission order, plus everything that was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub cases: Vec<TestCase>,
    pub skips: Vec<GenerationSkip>,
}

impl GenerationReport {
    /// Skip counts keyed by [`SkipReason::code`].
    pub fn skip_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for skip in &self.skips {
            *counts.entry(skip.reason.code()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Path,
    Query,
}

#[derive(Debug, Clone)]
struct Dimension {
    name: String,
    normalized: String,
    values: Vec<String>,
    placement: Placement,
}

/// Expands [`EndpointSpec`]s into [`TestCase`]s.
pub struct TestCaseGenerator<'a> {
    config: &'a TestDataConfig,
    base_urls: &'a BaseUrls,
    catalog: &'a EndpointCatalog,
    exclusions: ExclusionRules,
    counters: TagCounters,
}

impl<'a> TestCaseGenerator<'a> {
    pub fn new(
        config: &'a TestDataConfig,
        base_urls: &'a BaseUrls,
        catalog: &'a EndpointCatalog,
        exclusions: &ExclusionRules,
    ) -> Self {
        let mut normalized = ExclusionRules::new();
        for (param, values) in exclusions.iter() {
            normalized.insert(&normalize_column_name(param), values.iter().cloned());
        }
        Self {
            config,
            base_urls,
            catalog,
            exclusions: normalized,
            counters: TagCounters::default(),
        }
    }

    /// Expands every spec in order.
    pub fn generate(&mut self, specs: &[EndpointSpec]) -> GenerationReport {
        if self.catalog.is_open() {
            tracing::warn!("no endpoint listing supplied; rows are not validated against source/target");
        }
        if self.exclusions.is_empty() {
            tracing::debug!("no exclusion rules loaded; every combination is kept");
        }
        let mut report = GenerationReport::default();
        for spec in specs {
            self.expand_row(spec, &mut report);
        }
        tracing::info!(
            rows = specs.len(),
            test_cases = report.cases.len(),
            skipped = report.skips.len(),
            skip_counts = ?report.skip_counts(),
            "test case generation finished"
        );
        report
    }

    fn expand_row(&mut self, spec: &EndpointSpec, report: &mut GenerationReport) {
        let skip = |reason: SkipReason| GenerationSkip {
            row: spec.row,
            tag: spec.tag.clone(),
            endpoint: spec.endpoint_template.clone(),
            reason,
        };
        let row_skip = |report: &mut GenerationReport, reason: SkipReason| {
            tracing::warn!(
                row = spec.row,
                tag = %spec.tag,
                endpoint = %spec.endpoint_template,
                "skipping inclusion row: {reason}"
            );
            report.skips.push(skip(reason));
        };

        for (field, value) in [
            ("tag", &spec.tag),
            ("method", &spec.method),
            ("endpoint", &spec.endpoint_template),
        ] {
            if value.trim().is_empty() {
                row_skip(report, SkipReason::IncompleteRow(field));
                return;
            }
        }

        let key = spec.key();
        if !self.catalog.contains(&key) {
            row_skip(report, SkipReason::NotInCatalog(key));
            return;
        }
        if key.method != "GET" {
            row_skip(report, SkipReason::UnsupportedMethod(key.method));
            return;
        }

        let dimensions = match self.resolve_dimensions(spec) {
            Ok(dimensions) => dimensions,
            Err(reason) => {
                row_skip(report, reason);
                return;
            }
        };

        let lists: Vec<&[String]> = dimensions
            .iter()
            .map(|dimension| dimension.values.as_slice())
            .collect();
        for combination in Combinations::new(&lists) {
            let normalized: BTreeMap<String, String> = dimensions
                .iter()
                .zip(&combination)
                .map(|(dimension, value)| (dimension.normalized.clone(), (*value).clone()))
                .collect();
            if let Some((param, value)) = self.exclusions.first_violation(&normalized) {
                let param = dimensions
                    .iter()
                    .find(|dimension| dimension.normalized == param)
                    .map_or(param, |dimension| dimension.name.as_str());
                let reason = SkipReason::ExcludedValue {
                    param: param.to_string(),
                    value: value.to_string(),
                };
                tracing::debug!(row = spec.row, tag = %spec.tag, "skipping combination: {reason}");
                report.skips.push(skip(reason));
                continue;
            }

            let mut path_values = BTreeMap::new();
            let mut query = Vec::new();
            let mut resolved_params = BTreeMap::new();
            for (dimension, value) in dimensions.iter().zip(combination) {
                resolved_params.insert(dimension.name.clone(), value.clone());
                match dimension.placement {
                    Placement::Path => {
                        path_values.insert(dimension.name.clone(), value.clone());
                    }
                    Placement::Query => query.push((dimension.name.clone(), value.clone())),
                }
            }

            let path = substitute_placeholders(&spec.endpoint_template, &path_values);
            if has_unresolved_placeholder(&path) {
                let reason = SkipReason::UnresolvedPlaceholder(path);
                tracing::warn!(row = spec.row, tag = %spec.tag, "dropping combination: {reason}");
                report.skips.push(skip(reason));
                continue;
            }

            let id = self.counters.next_id(&spec.tag);
            report.cases.push(TestCase {
                id,
                tag: spec.tag.clone(),
                endpoint: spec.endpoint_template.clone(),
                source_url: build_request_url(&self.base_urls.source, &path, &query),
                target_url: build_request_url(&self.base_urls.target, &path, &query),
                resolved_params,
                source_row: spec.row,
            });
        }
    }

    /// Resolves the value list of every path placeholder and query column,
    /// with JSON overrides applied.
    fn resolve_dimensions(&self, spec: &EndpointSpec) -> Result<Vec<Dimension>, SkipReason> {
        let overrides: BTreeMap<String, Vec<String>> = self
            .config
            .overrides_for(&spec.tag)
            .into_iter()
            .map(|(name, values)| (normalize_column_name(&name), values))
            .collect();
        let columns: BTreeMap<String, (&String, &Vec<String>)> = spec
            .allowed_param_values
            .iter()
            .map(|(name, values)| (normalize_column_name(name), (name, values)))
            .collect();
        let reporting_date = normalize_column_name(REPORTING_DATE_PARAM);

        let mut dimensions = Vec::new();
        let mut placeholder_keys = BTreeSet::new();
        for name in extract_placeholders(&spec.endpoint_template) {
            let normalized = normalize_column_name(&name);
            let values = if normalized == reporting_date {
                overrides.get(&normalized).cloned().unwrap_or_default()
            } else {
                columns
                    .get(&normalized)
                    .map(|(_, values)| (*values).clone())
                    .unwrap_or_default()
            };
            if values.is_empty() {
                return Err(SkipReason::MissingValues(name));
            }
            placeholder_keys.insert(normalized.clone());
            dimensions.push(Dimension {
                name,
                normalized,
                values,
                placement: Placement::Path,
            });
        }

        for (normalized, (name, values)) in &columns {
            if values.is_empty() || placeholder_keys.contains(normalized) {
                continue;
            }
            dimensions.push(Dimension {
                name: (*name).clone(),
                normalized: normalized.clone(),
                values: (*values).clone(),
                placement: Placement::Query,
            });
        }

        for dimension in &mut dimensions {
            if let Some(forced) = overrides.get(&dimension.normalized) {
                dimension.values = forced.clone();
            }
        }
        Ok(dimensions)
    }
}

/// Lazy Cartesian product: one value per list, the last list varying
/// fastest. No lists yield a single empty combination; any empty list yields
/// nothing.
struct Combinations<'a> {
    lists: &'a [&'a [String]],
    indices: Vec<usize>,
    exhausted: bool,
}

impl<'a> Combinations<'a> {
    fn new(lists: &'a [&'a [String]]) -> Self {
        Self {
            lists,
            indices: vec![0; lists.len()],
            exhausted: lists.iter().any(|list| list.is_empty()),
        }
    }
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Vec<&'a String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let current = self
            .lists
            .iter()
            .zip(&self.indices)
            .map(|(list, &index)| {
                let list: &'a [String] = *list;
                &list[index]
            })
            .collect();

        self.exhausted = true;
        for position in (0..self.lists.len()).rev() {
            self.indices[position] += 1;
            if self.indices[position] < self.lists[position].len() {
                self.exhausted = false;
                break;
            }
            self.indices[position] = 0;
        }
        Some(current)
    }
}

/// Joins base URL, resolved path, and form-encoded query parameters.
pub fn build_request_url(base: &str, path: &str, query: &[(String, String)]) -> String {
    let base = clean_text(base);
    let base = base.trim_end_matches('/');
    let path = clean_text(path);
    let mut url = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    if !query.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter().map(|(name, value)| (name.as_str(), value.as_str())))
            .finish();
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&encoded);
    }
    url
}
