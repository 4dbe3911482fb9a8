use std::collections::BTreeMap;
use std::path::Path;

use crate::ConfigError;

/// File name picked up from the working directory when no file is named.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Variables from a `.env` file layered under the process environment.
///
/// Lookups consult the process first, so an exported variable always beats the
/// file entry of the same name. The process environment is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvLayer {
    file_vars: BTreeMap<String, String>,
}

impl EnvLayer {
    /// A layer with no file behind it.
    pub fn process_only() -> Self {
        Self::default()
    }

    /// Parses `path` with dotenv syntax (comments and quoting).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let entries = dotenvy::from_path_iter(path).map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file_vars = BTreeMap::new();
        for entry in entries {
            let (name, value) = entry.map_err(|source| ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            })?;
            file_vars.insert(name, value);
        }
        tracing::info!(
            path = %path.display(),
            variables = file_vars.len(),
            "loaded env file"
        );
        Ok(Self { file_vars })
    }

    /// An explicit file must exist; otherwise `<dir>/.env` is used when present.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let implicit = dir.join(DEFAULT_ENV_FILE);
        if implicit.is_file() {
            return Self::from_file(&implicit);
        }
        Ok(Self::process_only())
    }

    /// Looks `name` up in the process environment, then in the file.
    pub fn get(&self, name: &str) -> Option<String> {
        self.get_with(name, |name| std::env::var(name).ok())
    }

    /// [`EnvLayer::get`] with an injected process lookup.
    pub fn get_with<F>(&self, name: &str, process: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        process(name).or_else(|| self.file_vars.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::tempdir;

    use super::EnvLayer;
    use crate::{resolve_base_urls, BaseUrlOverrides, ConfigError, TestDataConfig};

    fn config() -> TestDataConfig {
        TestDataConfig {
            system: "PL".to_string(),
            region: "LDN".to_string(),
            env_source: "UAT".to_string(),
            env_target: "PROD".to_string(),
            ..TestDataConfig::default()
        }
    }

    #[test]
    fn functional_base_urls_resolve_from_env_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join(".env");
        std::fs::write(
            &path,
            "# environments\nPL_LDN_UAT=https://uat.example/\nPL_LDN_PROD=\"https://prod.example\"\n",
        )
        .expect("write env file");

        let layer = EnvLayer::from_file(&path).expect("load");
        let urls = resolve_base_urls(&config(), &BaseUrlOverrides::default(), |name| {
            layer.get_with(name, |_| None)
        })
        .expect("resolve");
        assert_eq!(urls.source, "https://uat.example");
        assert_eq!(urls.target, "https://prod.example");
    }

    #[test]
    fn unit_process_variable_wins_over_file_entry() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("custom.env");
        std::fs::write(&path, "USERNAME=from-file\nPASSWORD=file-secret\n").expect("write");

        let layer = EnvLayer::from_file(&path).expect("load");
        let process = |name: &str| (name == "USERNAME").then(|| "exported".to_string());
        assert_eq!(layer.get_with("USERNAME", process).as_deref(), Some("exported"));
        assert_eq!(
            layer.get_with("PASSWORD", process).as_deref(),
            Some("file-secret")
        );
        assert_eq!(layer.get_with("ABSENT", process), None);
    }

    #[test]
    fn functional_discover_uses_dot_env_in_dir_only_when_present() {
        let temp = tempdir().expect("tempdir");
        let empty = EnvLayer::discover(None, temp.path()).expect("no file is fine");
        assert_eq!(empty, EnvLayer::process_only());

        std::fs::write(temp.path().join(".env"), "PL_LDN_UAT=https://uat\n").expect("write");
        let found = EnvLayer::discover(None, temp.path()).expect("discover");
        assert_eq!(
            found.get_with("PL_LDN_UAT", |_| None).as_deref(),
            Some("https://uat")
        );
    }

    #[test]
    fn regression_missing_explicit_env_file_is_fatal() {
        let temp = tempdir().expect("tempdir");
        let error = EnvLayer::discover(Some(&temp.path().join("missing.env")), Path::new("."))
            .expect_err("explicit file must exist");
        assert!(matches!(error, ConfigError::EnvFile { .. }), "{error}");
    }
}
