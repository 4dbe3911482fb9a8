use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use recon_config::{
    DEFAULT_PASSWORD_ENV, DEFAULT_USERNAME_ENV, SOURCE_BASE_URL_ENV, TARGET_BASE_URL_ENV,
};
use recon_fetch::DEFAULT_MAX_IN_FLIGHT;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "recon",
    about = "Reconcile GET responses between a source and a target API deployment",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate test cases, fetch both environments, and write the comparison report.
    Run(RunArgs),
    /// Generate test cases and write them to a workbook without any network access.
    Generate(GenerateArgs),
    /// Re-compare a previous run dump offline.
    Compare(CompareArgs),
}

/// Inputs shared by every command that plans test cases.
#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    #[arg(
        long,
        env = "RECON_INCLUSION",
        help = "Inclusion criteria spreadsheet (.xlsx/.xls/.ods/.csv) with tag, method, endpoint and parameter columns"
    )]
    pub inclusion: PathBuf,

    #[arg(
        long = "inclusion-sheet",
        help = "Sheet of the inclusion workbook to read (defaults to the first sheet)"
    )]
    pub inclusion_sheet: Option<String>,

    #[arg(
        long,
        env = "RECON_CONFIG",
        help = "ApiTestData JSON descriptor (System, Region, Env_Source, Env_Target, TestData)"
    )]
    pub config: PathBuf,

    #[arg(
        long,
        env = "RECON_EXCLUSION",
        value_delimiter = ',',
        help = "Exclusion spreadsheet with Parameter and Values columns; repeat the flag to merge several files"
    )]
    pub exclusion: Vec<PathBuf>,

    #[arg(
        long,
        env = "RECON_ENDPOINTS",
        help = "Optional endpoint listing workbook with SOURCE and TARGET sheets; rows not listed on both are skipped"
    )]
    pub endpoints: Option<PathBuf>,

    #[arg(
        long = "env-file",
        env = "RECON_ENV_FILE",
        help = "dotenv file with base URL and credential variables (defaults to ./.env when present); exported variables win"
    )]
    pub env_file: Option<PathBuf>,

    #[arg(
        long = "source-base-url",
        env = SOURCE_BASE_URL_ENV,
        help = "Explicit source base URL; overrides the {System}_{Region}_{Env_Source} variable"
    )]
    pub source_base_url: Option<String>,

    #[arg(
        long = "target-base-url",
        env = TARGET_BASE_URL_ENV,
        help = "Explicit target base URL; overrides the {System}_{Region}_{Env_Target} variable"
    )]
    pub target_base_url: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    #[arg(long, help = "Comparison report workbook to write (.xlsx)")]
    pub output: PathBuf,

    #[arg(
        long,
        env = "RECON_CONCURRENCY",
        default_value_t = DEFAULT_MAX_IN_FLIGHT,
        value_parser = parse_positive_usize,
        help = "Maximum number of test cases fetched concurrently (each case is one source and one target request)"
    )]
    pub concurrency: usize,

    #[arg(
        long = "timeout-secs",
        env = "RECON_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = parse_positive_u64,
        help = "Per-request timeout in seconds"
    )]
    pub timeout_secs: u64,

    #[arg(
        long,
        help = "Write the raw run (test cases and fetch results) as JSON before the report"
    )]
    pub dump: Option<PathBuf>,

    #[arg(
        long = "responses-dir",
        help = "Save each raw body as <test_id>_SOURCE.json / <test_id>_TARGET.json in this directory"
    )]
    pub responses_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "RECON_INSECURE",
        default_value_t = false,
        action = ArgAction::SetTrue,
        help = "Skip TLS certificate verification"
    )]
    pub insecure: bool,

    #[arg(
        long = "require-auth",
        default_value_t = false,
        action = ArgAction::SetTrue,
        help = "Fail instead of sending anonymous requests when no credentials are configured. Credentials are sent as HTTP Basic only; NTLM and Digest endpoints will answer 401"
    )]
    pub require_auth: bool,

    #[arg(
        long = "username-env",
        default_value = DEFAULT_USERNAME_ENV,
        help = "Environment variable holding the basic-auth username"
    )]
    pub username_env: String,

    #[arg(
        long = "password-env",
        default_value = DEFAULT_PASSWORD_ENV,
        help = "Environment variable holding the basic-auth password"
    )]
    pub password_env: String,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    #[arg(long, help = "Test case workbook to write (.xlsx)")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct CompareArgs {
    #[arg(long, help = "Run dump JSON written by a previous `recon run --dump`")]
    pub dump: PathBuf,

    #[arg(long, help = "Comparison report workbook to write (.xlsx)")]
    pub output: PathBuf,
}
