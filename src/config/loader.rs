//! Configuration loading from a JSON file

use crate::config::types::{RunnerConfig, RunnerError, Result};
use crate::config::validator::validate_config;
use std::path::Path;

impl RunnerConfig {
    /// Load configuration from a JSON file. Keys not present keep their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_content = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&config_content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RunnerError::Config(format!("Failed to parse config JSON: {}", e)))
    }
}

/// Resolve the effective configuration: defaults, overlaid by `path` when
/// given, then validated.
pub fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    let config = match path {
        Some(path) => RunnerConfig::load_from_file(path)?,
        None => RunnerConfig::default(),
    };

    let validation = validate_config(&config)?;
    for warning in validation.warnings {
        log::warn!("Configuration warning: {}", warning);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{DEFAULT_ADDRESS_SPACE_BYTES, DEFAULT_DEADLINE_SECS};

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RunnerConfig::from_json(r#"{"limits": {"cpu_time_secs": 2}}"#).unwrap();
        assert_eq!(config.limits.cpu_time_secs, 2);
        assert_eq!(config.limits.address_space_bytes, DEFAULT_ADDRESS_SPACE_BYTES);
        assert_eq!(config.deadline_secs, DEFAULT_DEADLINE_SECS);
        assert_eq!(config.interpreter.program, "python3");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RunnerConfig::from_json(r#"{"deadline": 3}"#).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config JSON"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_config(Some(Path::new("/nonexistent/shotbox.json"))).unwrap_err();
        assert!(matches!(err, RunnerError::Config(_)));
    }

    #[test]
    fn no_path_yields_validated_defaults() {
        assert_eq!(load_config(None).unwrap(), RunnerConfig::default());
    }

    #[test]
    fn invalid_values_fail_validation() {
        let path = std::env::temp_dir().join(format!("shotbox-cfg-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"deadline_secs": 0}"#).unwrap();
        let result = load_config(Some(&path));
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }
}
