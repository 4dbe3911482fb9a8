use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ConfigError;

/// Name of the `TestData` section applied to every tag.
pub const DEFAULT_TEST_DATA_SECTION: &str = "default";

/// The `ApiTestData.json` descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestDataConfig {
    #[serde(rename = "System", default)]
    pub system: String,
    #[serde(rename = "Region", default)]
    pub region: String,
    #[serde(rename = "Env_Source", default)]
    pub env_source: String,
    #[serde(rename = "Env_Target", default)]
    pub env_target: String,
    #[serde(rename = "URLTYPE", default)]
    pub url_type: String,
    /// `default` plus per-tag sections of parameter overrides.
    #[serde(rename = "TestData", default)]
    pub test_data: BTreeMap<String, BTreeMap<String, Value>>,
}

impl TestDataConfig {
    /// Parameter overrides for `tag`: the `default` section with the tag's own section on top.
    pub fn overrides_for(&self, tag: &str) -> BTreeMap<String, Vec<String>> {
        let mut merged = BTreeMap::new();
        let sections = [DEFAULT_TEST_DATA_SECTION, tag.trim()];
        for section in sections {
            let Some(values) = self.test_data.get(section) else {
                continue;
            };
            for (param, value) in values {
                let values = override_values(value);
                if values.is_empty() {
                    continue;
                }
                merged.insert(param.trim().to_string(), values);
            }
            if tag.trim() == DEFAULT_TEST_DATA_SECTION {
                break;
            }
        }
        merged
    }
}

/// Flattens a JSON override into literal string values. `null` and empty strings yield nothing.
pub fn override_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text.to_string()]
            }
        }
        Value::Number(number) => vec![number.to_string()],
        Value::Bool(flag) => vec![flag.to_string()],
        Value::Array(items) => items.iter().flat_map(override_values).collect(),
        Value::Object(_) => vec![value.to_string()],
    }
}

/// Loads and parses the JSON test-data descriptor.
pub fn load_test_data_config(path: &Path) -> Result<TestDataConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: TestDataConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(
        system = %config.system,
        region = %config.region,
        env_source = %config.env_source,
        env_target = %config.env_target,
        "loaded test data config from {}",
        path.display()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{load_test_data_config, override_values, TestDataConfig};
    use crate::ConfigError;

    fn sample() -> TestDataConfig {
        serde_json::from_value(json!({
            "System": "PL",
            "Region": "London",
            "Env_Source": "UAT",
            "Env_Target": "PROD",
            "URLTYPE": "DS",
            "TestData": {
                "default": { "reportingDate": "2024-03-28", "ccy": "GBP", "unused": null },
                "Pricing": { "ccy": ["USD", "JPY"], "book": 42 }
            }
        }))
        .expect("sample config")
    }

    #[test]
    fn unit_override_values_flattens_scalars_and_arrays() {
        assert_eq!(override_values(&json!("  GBP ")), vec!["GBP"]);
        assert_eq!(override_values(&json!(7)), vec!["7"]);
        assert_eq!(override_values(&json!(true)), vec!["true"]);
        assert_eq!(override_values(&json!(["A", 1, null])), vec!["A", "1"]);
        assert!(override_values(&json!(null)).is_empty());
        assert!(override_values(&json!("")).is_empty());
    }

    #[test]
    fn functional_overrides_for_tag_section_wins_over_default() {
        let config = sample();
        let pricing = config.overrides_for("Pricing");
        assert_eq!(pricing["ccy"], vec!["USD", "JPY"]);
        assert_eq!(pricing["book"], vec!["42"]);
        assert_eq!(pricing["reportingDate"], vec!["2024-03-28"]);
        assert!(!pricing.contains_key("unused"));

        let other = config.overrides_for("Risk");
        assert_eq!(other["ccy"], vec!["GBP"]);
        assert!(!other.contains_key("book"));
    }

    #[test]
    fn functional_load_test_data_config_reads_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("ApiTestData.json");
        std::fs::write(
            &path,
            r#"{"System":"PL","Region":"London","Env_Source":"UAT","Env_Target":"PROD","URLTYPE":"DS","TestData":{"default":{"reportingDate":"2024-03-28"}}}"#,
        )
        .expect("write config");
        let config = load_test_data_config(&path).expect("load");
        assert_eq!(config.system, "PL");
        assert_eq!(config.url_type, "DS");
        assert_eq!(
            config.overrides_for("any")["reportingDate"],
            vec!["2024-03-28"]
        );
    }

    #[test]
    fn regression_load_test_data_config_reports_missing_and_malformed_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("missing.json");
        assert!(matches!(
            load_test_data_config(&missing),
            Err(ConfigError::Read { .. })
        ));

        let malformed = temp.path().join("bad.json");
        std::fs::write(&malformed, "{ not json").expect("write");
        assert!(matches!(
            load_test_data_config(&malformed),
            Err(ConfigError::Parse { .. })
        ));
    }
}
