use std::time::Duration;

use async_trait::async_trait;
use recon_config::Credentials;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use thiserror::Error;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("api-recon/", env!("CARGO_PKG_VERSION"));
const ACCEPT_VALUE: &str = "application/json, text/plain, */*";

/// Status and raw body of a completed request. Non-2xx statuses land here too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
/// Failure to obtain a response for one side of a test case.
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to read response body (status {status}): {message}")]
    Body { status: u16, message: String },
    #[error("failed to build http client: {0}")]
    Client(String),
}

impl TransportError {
    /// Status line received before the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Body { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}

#[async_trait]
/// Seam between the fetcher and the network.
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// Client settings shared by every request of a run.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub credentials: Option<Credentials>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: false,
            credentials: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Production transport backed by a single shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    credentials: Option<Credentials>,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled");
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent)
            .timeout(config.timeout.max(Duration::from_millis(1)))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|error| TransportError::Client(error.to_string()))?;

        Ok(Self {
            client,
            credentials: config.credentials,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.secret));
        }
        let response = request.send().await.map_err(TransportError::from_reqwest)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::Body {
                status,
                message: error.to_string(),
            })?;
        Ok(HttpResponse { status, body })
    }
}
