//! `recon` command line: plans test cases from spreadsheets, fetches both
//! environments, and writes the comparison report.

mod bootstrap;
mod cli_args;
mod commands;
mod pipeline;

pub use bootstrap::init_tracing;
pub use cli_args::*;
pub use commands::run_cli;
pub use pipeline::*;
