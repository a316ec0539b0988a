//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::KeygateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<KeygateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), gates = config.gates.len(), "Configuration loaded");
    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<KeygateConfig, ConfigError> {
    let config: KeygateConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [observability]
            log_level = "debug"
            log_format = "json"

            [gates.payments]
            failure_threshold = 5
            interval_ms = 20000
            cooldown_ms = 3000

            [gates.search]
            failure_threshold = 50
            cooldown_ms = 500
            shards = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.gates.len(), 2);
        assert_eq!(config.gates["search"].shards, Some(16));
        assert_eq!(config.gates["payments"].failure_threshold, 5);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = parse_config("[gates.payments\nfailure_threshold = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = parse_config(
            r#"
            [gates.a]
            failure_threshold = 0

            [gates.b]
            failure_threshold = -1
            "#,
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("gate 'a'"));
        assert!(message.contains("gate 'b'"));
        assert!(message.contains(", "));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("keygate_loader_test.toml");
        fs::write(&path, "[gates.jobs]\nfailure_threshold = 2\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.gates["jobs"].failure_threshold, 2);

        fs::remove_file(&path).unwrap_or_default();
    }
}
