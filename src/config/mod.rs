pub mod pool;

pub use pool::{
    validate_autoscaler, validate_pool, validate_settings, AutoscalerConfig, PoolConfig,
    ReconcilerSettings, ValidationError, AUTOSCALER_TYPE,
};

use std::path::Path;
use thiserror::Error;

/// Errors for file I/O operations (separate from pure parsing errors)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ValidationError),
}

// ============================================================================
// SBIO: Pure parsing
// ============================================================================

/// Parse and validate an autoscaler document from JSON.
pub fn parse_autoscaler_json(content: &str) -> Result<AutoscalerConfig, ConfigError> {
    let config: AutoscalerConfig =
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_autoscaler(&config)?;
    Ok(config)
}

/// Parse and validate an autoscaler document from YAML.
pub fn parse_autoscaler_yaml(content: &str) -> Result<AutoscalerConfig, ConfigError> {
    let config: AutoscalerConfig =
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_autoscaler(&config)?;
    Ok(config)
}

// ============================================================================
// SBIO: I/O wrapper - thin layer over pure functions
// ============================================================================

/// Load an autoscaler config file from disk.
/// `.yaml`/`.yml` files are read as YAML, everything else as JSON.
pub fn load_autoscaler_file(path: &Path) -> Result<AutoscalerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => parse_autoscaler_yaml(&content),
        _ => parse_autoscaler_json(&content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_file(content: &str, suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_json_file() {
        let content = r#"{
            "type": "gce",
            "envConfig": {
                "projectId": "super-project",
                "zoneName": "winkie-country",
                "managedInstanceGroupName": "druid-mig",
                "targetWorkers": 2,
                "minWorkers": 1,
                "maxWorkers": 8
            },
            "settings": { "pollIntervalMillis": 1000 }
        }"#;

        let file = create_temp_file(content, ".json");
        let config = load_autoscaler_file(file.path()).unwrap();
        assert_eq!(config.env_config.max_workers, 8);
        assert_eq!(config.settings.poll_interval_millis, 1000);
        assert_eq!(config.settings.max_filter_predicates, 100);
    }

    #[test]
    fn test_load_yaml_file() {
        let content = r#"
type: gce
envConfig:
  projectId: super-project
  zone: winkie-country
  managedInstanceGroupName: druid-mig
  targetWorkers: 1
  minWorkers: 0
  maxWorkers: 3
"#;

        let file = create_temp_file(content, ".yaml");
        let config = load_autoscaler_file(file.path()).unwrap();
        assert_eq!(config.env_config.zone_name, "winkie-country");
    }

    #[test]
    fn test_load_invalid_bounds() {
        let content = r#"{
            "type": "gce",
            "envConfig": {
                "projectId": "p",
                "zoneName": "z",
                "managedInstanceGroupName": "g",
                "targetWorkers": 1,
                "minWorkers": 9,
                "maxWorkers": 3
            }
        }"#;

        let file = create_temp_file(content, ".json");
        let result = load_autoscaler_file(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let file = create_temp_file("{ not json", ".json");
        let result = load_autoscaler_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_autoscaler_file(Path::new("/nonexistent/autoscaler.json"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
