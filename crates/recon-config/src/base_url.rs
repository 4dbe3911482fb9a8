use recon_core::clean_text;

use crate::{ConfigError, TestDataConfig};

/// Environment variable read for an explicit source base URL.
pub const SOURCE_BASE_URL_ENV: &str = "SOURCE_BASEURL";
/// Environment variable read for an explicit target base URL.
pub const TARGET_BASE_URL_ENV: &str = "TARGET_BASEURL";

/// Resolved base URLs of the two environments being compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrls {
    pub source: String,
    pub target: String,
}

/// Explicit base URLs that bypass the `{System}_{Region}_{Env}` convention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseUrlOverrides {
    pub source: Option<String>,
    pub target: Option<String>,
}

impl TestDataConfig {
    /// Environment variable holding the source base URL, e.g. `PL_London_UAT`.
    pub fn source_env_var(&self) -> Result<String, ConfigError> {
        self.env_var_name(&self.env_source, "Env_Source")
    }

    /// Environment variable holding the target base URL.
    pub fn target_env_var(&self) -> Result<String, ConfigError> {
        self.env_var_name(&self.env_target, "Env_Target")
    }

    fn env_var_name(&self, env: &str, env_field: &'static str) -> Result<String, ConfigError> {
        let system = require_field(&self.system, "System")?;
        let region = require_field(&self.region, "Region")?;
        let env = require_field(env, env_field)?;
        Ok(format!("{system}_{region}_{env}"))
    }
}

fn require_field<'a>(value: &'a str, name: &'static str) -> Result<&'a str, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingField(name));
    }
    Ok(trimmed)
}

/// Resolves both base URLs. Explicit overrides win; otherwise the
/// `{System}_{Region}_{Env}` variable is read through `lookup`.
pub fn resolve_base_urls<F>(
    config: &TestDataConfig,
    overrides: &BaseUrlOverrides,
    lookup: F,
) -> Result<BaseUrls, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let source = resolve_side(
        "source",
        overrides.source.as_deref(),
        || config.source_env_var(),
        &lookup,
    )?;
    let target = resolve_side(
        "target",
        overrides.target.as_deref(),
        || config.target_env_var(),
        &lookup,
    )?;
    Ok(BaseUrls { source, target })
}

fn resolve_side<F>(
    side: &'static str,
    explicit: Option<&str>,
    var_name: impl FnOnce() -> Result<String, ConfigError>,
    lookup: &F,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = explicit.map(str::trim).filter(|value| !value.is_empty());
    let value = match explicit {
        Some(value) => {
            tracing::debug!(side, "using explicit base URL override");
            value.to_string()
        }
        None => {
            let var = var_name()?;
            let Some(value) = lookup(&var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
            else {
                return Err(ConfigError::MissingBaseUrl { side, var });
            };
            tracing::debug!(side, var = %var, "resolved base URL from environment");
            value
        }
    };
    normalize_base_url(side, &value)
}

fn normalize_base_url(side: &'static str, raw: &str) -> Result<String, ConfigError> {
    let cleaned = clean_text(raw);
    let cleaned = cleaned.trim_end_matches('/');
    let lowered = cleaned.to_ascii_lowercase();
    if !(lowered.starts_with("http://") || lowered.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl {
            side,
            value: raw.to_string(),
        });
    }
    Ok(cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{resolve_base_urls, BaseUrlOverrides, BaseUrls};
    use crate::{ConfigError, TestDataConfig};

    fn config() -> TestDataConfig {
        TestDataConfig {
            system: "PL".to_string(),
            region: "London".to_string(),
            env_source: "UAT".to_string(),
            env_target: "PROD".to_string(),
            ..TestDataConfig::default()
        }
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn unit_env_var_names_follow_system_region_env_convention() {
        let config = config();
        assert_eq!(config.source_env_var().expect("source"), "PL_London_UAT");
        assert_eq!(config.target_env_var().expect("target"), "PL_London_PROD");
    }

    #[test]
    fn functional_resolve_base_urls_reads_convention_variables() {
        let vars = env(&[
            ("PL_London_UAT", " https://uat.example:21100/ "),
            ("PL_London_PROD", "https://prod.example:21100"),
        ]);
        let urls = resolve_base_urls(&config(), &BaseUrlOverrides::default(), |name| {
            vars.get(name).cloned()
        })
        .expect("resolve");
        assert_eq!(
            urls,
            BaseUrls {
                source: "https://uat.example:21100".to_string(),
                target: "https://prod.example:21100".to_string(),
            }
        );
    }

    #[test]
    fn functional_explicit_overrides_skip_environment_lookup() {
        let overrides = BaseUrlOverrides {
            source: Some("http://127.0.0.1:9000".to_string()),
            target: Some("http://127.0.0.1:9001/".to_string()),
        };
        let urls = resolve_base_urls(&TestDataConfig::default(), &overrides, |_| None)
            .expect("overrides need no config fields");
        assert_eq!(urls.source, "http://127.0.0.1:9000");
        assert_eq!(urls.target, "http://127.0.0.1:9001");
    }

    #[test]
    fn regression_base_url_is_nfkc_cleaned() {
        let overrides = BaseUrlOverrides {
            source: Some("\u{FEFF}ｈｔｔｐｓ://uat.example：8443/\u{00A0}".to_string()),
            target: Some("https://prod.example\u{200B}".to_string()),
        };
        let urls = resolve_base_urls(&TestDataConfig::default(), &overrides, |_| None)
            .expect("compatibility forms fold to ASCII");
        assert_eq!(urls.source, "https://uat.example:8443");
        assert_eq!(urls.target, "https://prod.example");
    }

    #[test]
    fn regression_missing_variable_names_the_expected_key() {
        let vars = env(&[("PL_London_UAT", "https://uat.example")]);
        let error = resolve_base_urls(&config(), &BaseUrlOverrides::default(), |name| {
            vars.get(name).cloned()
        })
        .expect_err("target missing");
        match error {
            ConfigError::MissingBaseUrl { side, var } => {
                assert_eq!(side, "target");
                assert_eq!(var, "PL_London_PROD");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn regression_rejects_non_http_base_url_and_missing_fields() {
        let overrides = BaseUrlOverrides {
            source: Some("ftp://host".to_string()),
            target: Some("https://ok".to_string()),
        };
        assert!(matches!(
            resolve_base_urls(&config(), &overrides, |_| None),
            Err(ConfigError::InvalidBaseUrl { side: "source", .. })
        ));

        assert!(matches!(
            resolve_base_urls(
                &TestDataConfig::default(),
                &BaseUrlOverrides::default(),
                |_| None
            ),
            Err(ConfigError::MissingField("System"))
        ));
    }
}
