//! Credential resolution for the paired fetch.
//!
//! The credential source is an external collaborator; the core only sees the
//! [`CredentialProvider`] trait. Absent credentials are tolerated unless the
//! caller requires authentication.

use std::fmt;

use crate::ConfigError;

/// Default environment variable for the account name.
pub const DEFAULT_USERNAME_ENV: &str = "USERNAME";
/// Default environment variable for the account secret.
pub const DEFAULT_PASSWORD_ENV: &str = "PASSWORD";

/// Username/secret pair attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Resolves the current credentials, or `None` when none are configured.
pub trait CredentialProvider: Send + Sync {
    fn resolve(&self) -> Result<Option<Credentials>, ConfigError>;

    /// Short description used in log lines.
    fn describe(&self) -> String;
}

/// Reads credentials from a pair of environment variables.
pub struct EnvCredentialProvider {
    username_var: String,
    password_var: String,
    lookup: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl EnvCredentialProvider {
    /// Uses the process environment.
    pub fn new(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self::with_lookup(username_var, password_var, |name| std::env::var(name).ok())
    }

    pub fn with_lookup<F>(
        username_var: impl Into<String>,
        password_var: impl Into<String>,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            username_var: username_var.into(),
            password_var: password_var.into(),
            lookup: Box::new(lookup),
        }
    }

    fn non_empty(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME_ENV, DEFAULT_PASSWORD_ENV)
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn resolve(&self) -> Result<Option<Credentials>, ConfigError> {
        let username = self.non_empty(&self.username_var);
        let secret = self.non_empty(&self.password_var);
        Ok(match (username, secret) {
            (Some(username), Some(secret)) => Some(Credentials { username, secret }),
            _ => None,
        })
    }

    fn describe(&self) -> String {
        format!("env:{}/{}", self.username_var, self.password_var)
    }
}

/// Resolves credentials once for the whole batch.
///
/// With `required == false`, missing credentials produce a warning and the run
/// proceeds anonymously.
pub fn resolve_credentials(
    provider: &dyn CredentialProvider,
    required: bool,
) -> Result<Option<Credentials>, ConfigError> {
    match provider.resolve()? {
        Some(credentials) => {
            tracing::info!(
                username = %credentials.username,
                provider = %provider.describe(),
                "authenticating requests"
            );
            Ok(Some(credentials))
        }
        None if required => Err(ConfigError::MissingCredentials {
            provider: provider.describe(),
        }),
        None => {
            tracing::warn!(
                provider = %provider.describe(),
                "no credentials found; sending anonymous requests"
            );
            Ok(None)
        }
    }
}
