use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use recon_compare::{
    build_run_dump, compare_results, load_run_dump, write_comparison_report, write_run_dump,
    write_test_case_workbook, ReportSummary, SkippedEntry,
};
use recon_config::{
    load_test_data_config, resolve_base_urls, BaseUrlOverrides, BaseUrls, TestDataConfig,
    SOURCE_BASE_URL_ENV, TARGET_BASE_URL_ENV,
};
use recon_fetch::{FetcherConfig, HttpTransport, ParallelFetcher};
use recon_plan::{
    load_endpoint_catalog, load_exclusions, load_inclusion_specs, EndpointCatalog,
    GenerationReport, TestCaseGenerator,
};
use recon_types::ExclusionRules;
use tokio::sync::watch;

use crate::PlanArgs;

/// Everything needed before a single request is issued.
#[derive(Debug, Clone)]
pub struct Plan {
    pub config: TestDataConfig,
    pub base_urls: BaseUrls,
    pub generation: GenerationReport,
}

/// Loads every input and expands the inclusion rows. Environment variables
/// are read through `lookup`, which also supplies the explicit base URL
/// variables when the flags were not given.
pub fn build_plan<F>(args: &PlanArgs, lookup: F) -> Result<Plan>
where
    F: Fn(&str) -> Option<String>,
{
    let config = load_test_data_config(&args.config)?;
    let overrides = BaseUrlOverrides {
        source: args
            .source_base_url
            .clone()
            .or_else(|| lookup(SOURCE_BASE_URL_ENV)),
        target: args
            .target_base_url
            .clone()
            .or_else(|| lookup(TARGET_BASE_URL_ENV)),
    };
    let base_urls = resolve_base_urls(&config, &overrides, lookup)?;
    tracing::info!(source = %base_urls.source, target = %base_urls.target, "resolved base URLs");

    let catalog = match &args.endpoints {
        Some(path) => load_endpoint_catalog(path)?,
        None => EndpointCatalog::open(),
    };
    let mut exclusions = ExclusionRules::new();
    for path in &args.exclusion {
        exclusions.merge(&load_exclusions(path)?);
    }
    let specs = load_inclusion_specs(&args.inclusion, args.inclusion_sheet.as_deref())?;

    let generation =
        TestCaseGenerator::new(&config, &base_urls, &catalog, &exclusions).generate(&specs);
    if generation.cases.is_empty() {
        tracing::warn!("no test cases were generated; the report will be empty");
    }
    Ok(Plan {
        config,
        base_urls,
        generation,
    })
}

/// Flattens generator skips into report rows.
pub fn skipped_entries(generation: &GenerationReport) -> Vec<SkippedEntry> {
    generation
        .skips
        .iter()
        .map(|skip| SkippedEntry {
            row: skip.row,
            tag: skip.tag.clone(),
            endpoint: skip.endpoint.clone(),
            reason: skip.reason.code().to_string(),
            detail: skip.reason.to_string(),
        })
        .collect()
}

/// Writes the `generate` workbook. Returns the number of test cases written.
pub fn execute_generate(plan: &Plan, output: &Path) -> Result<usize> {
    write_test_case_workbook(
        output,
        &plan.generation.cases,
        &plan.base_urls.source,
        &plan.base_urls.target,
        &skipped_entries(&plan.generation),
    )
    .with_context(|| format!("failed to write test case workbook {}", output.display()))?;
    Ok(plan.generation.cases.len())
}

/// Output locations of a `run`.
#[derive(Debug, Clone, Default)]
pub struct RunOutputs {
    pub report: PathBuf,
    pub dump: Option<PathBuf>,
}

/// Fetches every planned case, then writes the dump (if requested) and the
/// report. The dump goes first so a failing report write keeps the data.
pub async fn execute_run(
    plan: &Plan,
    transport: Arc<dyn HttpTransport>,
    fetcher_config: FetcherConfig,
    outputs: &RunOutputs,
    shutdown: watch::Receiver<bool>,
) -> Result<ReportSummary> {
    let fetcher = ParallelFetcher::new(transport, fetcher_config);
    let results = fetcher
        .run_with_shutdown(&plan.generation.cases, shutdown)
        .await;

    if let Some(dump_path) = &outputs.dump {
        let dump = build_run_dump(&plan.generation.cases, &results);
        write_run_dump(dump_path, &dump)
            .with_context(|| format!("failed to write run dump {}", dump_path.display()))?;
    }

    let rows = compare_results(&plan.generation.cases, &results);
    write_comparison_report(&outputs.report, &rows)
        .with_context(|| format!("failed to write report {}", outputs.report.display()))
}

/// Re-compares a saved run dump and writes a fresh report.
pub fn execute_compare(dump: &Path, output: &Path) -> Result<ReportSummary> {
    let dump = load_run_dump(dump)?;
    tracing::info!(
        generated_at = %dump.generated_at,
        test_cases = dump.test_cases.len(),
        results = dump.results.len(),
        "loaded run dump"
    );
    let rows = compare_results(&dump.test_cases, &dump.results);
    write_comparison_report(output, &rows)
        .with_context(|| format!("failed to write report {}", output.display()))
}
