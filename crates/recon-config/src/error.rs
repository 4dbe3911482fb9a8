use std::path::PathBuf;

use thiserror::Error;

/// Fatal setup failures; any of these aborts the run before fetching starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("config field '{0}' is missing or empty")]
    MissingField(&'static str),
    #[error("{side} base URL is not configured: set environment variable '{var}' or pass an explicit override")]
    MissingBaseUrl { side: &'static str, var: String },
    #[error("{side} base URL '{value}' must start with http:// or https://")]
    InvalidBaseUrl { side: &'static str, value: String },
    #[error("credentials are required but none were found via {provider}")]
    MissingCredentials { provider: String },
}
