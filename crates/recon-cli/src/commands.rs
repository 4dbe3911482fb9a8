use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use recon_compare::ReportSummary;
use recon_config::{resolve_credentials, EnvCredentialProvider, EnvLayer};
use recon_fetch::{FetcherConfig, ReqwestTransport, TransportConfig, DEFAULT_USER_AGENT};
use tokio::sync::watch;

use crate::{
    build_plan, execute_compare, execute_generate, execute_run, Cli, Command, CompareArgs,
    GenerateArgs, RunArgs, RunOutputs,
};

/// Dispatches the parsed command line.
pub async fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => run_command(args).await,
        Command::Generate(args) => generate_command(&args),
        Command::Compare(args) => compare_command(&args),
    }
}

fn load_env_layer(env_file: Option<&Path>) -> Result<EnvLayer> {
    EnvLayer::discover(env_file, Path::new(".")).context("failed to load env file")
}

async fn run_command(args: RunArgs) -> Result<()> {
    let env = load_env_layer(args.plan.env_file.as_deref())?;
    let plan = build_plan(&args.plan, |name| env.get(name))?;

    let provider = EnvCredentialProvider::with_lookup(
        &args.username_env,
        &args.password_env,
        move |name| env.get(name),
    );
    let credentials = resolve_credentials(&provider, args.require_auth)?;
    let transport = ReqwestTransport::new(TransportConfig {
        timeout: Duration::from_secs(args.timeout_secs),
        accept_invalid_certs: args.insecure,
        credentials,
        user_agent: DEFAULT_USER_AGENT.to_string(),
    })
    .context("failed to initialize http client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing in-flight requests");
            let _ = shutdown_tx.send(true);
        }
    });

    let outputs = RunOutputs {
        report: args.output.clone(),
        dump: args.dump.clone(),
    };
    let fetcher_config = FetcherConfig {
        max_in_flight: args.concurrency,
        responses_dir: args.responses_dir.clone(),
    };
    let outcome = execute_run(
        &plan,
        Arc::new(transport),
        fetcher_config,
        &outputs,
        shutdown_rx,
    )
    .await;
    ctrl_c.abort();

    let summary = outcome?;
    print_summary(&summary, &outputs.report.display().to_string());
    Ok(())
}

fn generate_command(args: &GenerateArgs) -> Result<()> {
    let env = load_env_layer(args.plan.env_file.as_deref())?;
    let plan = build_plan(&args.plan, |name| env.get(name))?;
    let written = execute_generate(&plan, &args.output)?;
    println!(
        "generated {written} test cases ({} skipped) -> {}",
        plan.generation.skips.len(),
        args.output.display()
    );
    Ok(())
}

fn compare_command(args: &CompareArgs) -> Result<()> {
    let summary = execute_compare(&args.dump, &args.output)?;
    print_summary(&summary, &args.output.display().to_string());
    Ok(())
}

fn print_summary(summary: &ReportSummary, report: &str) {
    println!(
        "compared {} test cases: {} match, {} not match, {} with transport errors -> {report}",
        summary.total, summary.matched, summary.not_matched, summary.transport_errors
    );
}
