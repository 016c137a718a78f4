//! Options for the text reports in `display`.
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid TOML display config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON display config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Missing keys fall back to their defaults; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Leave non-computable rules out of the summary.
    pub show_computable_only: bool,
    /// How many base names the summary header lists before eliding the rest.
    pub max_listed_base_names: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { show_computable_only: false, max_listed_base_names: 5 }
    }
}

impl DisplayConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DisplayConfig::default();
        assert!(!config.show_computable_only);
        assert_eq!(config.max_listed_base_names, 5);
        assert_eq!(DisplayConfig::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = DisplayConfig::from_toml_str("show_computable_only = true").unwrap();
        assert!(config.show_computable_only);
        assert_eq!(config.max_listed_base_names, 5);
    }

    #[test]
    fn test_json_and_rejection_of_unknown_keys() {
        let config = DisplayConfig::from_json_str(r#"{"max_listed_base_names": 2}"#).unwrap();
        assert_eq!(config.max_listed_base_names, 2);

        assert!(matches!(DisplayConfig::from_toml_str("colour = \"red\""), Err(ConfigError::Toml(_))));
        assert!(matches!(DisplayConfig::from_json_str("[1, 2]"), Err(ConfigError::Json(_))));
    }
}
