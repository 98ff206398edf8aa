//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GuardConfig, ConfigError> {
    let config: GuardConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_config(
            r#"
            [health_check]
            interval_secs = 5

            [[breakers]]
            name = "cache"
            window_size = 10
            minimum_calls = 5
            critical = false
            "#,
        )
        .unwrap();
        assert_eq!(config.health_check.interval_secs, 5);
        assert_eq!(config.breakers[0].name, "cache");
    }

    #[test]
    fn test_parse_cache_probe_row() {
        let config = parse_config(
            r#"
            [[breakers]]
            name = "cache"
            window_size = 10
            minimum_calls = 5

            [breakers.probe]
            address = "127.0.0.1:6379"
            timeout_ms = 250

            [[breakers]]
            name = "storage"
            critical = true
            "#,
        )
        .unwrap();

        let probe = config.breakers[0].probe.as_ref().unwrap();
        assert_eq!(probe.address, "127.0.0.1:6379");
        assert_eq!(probe.timeout_ms, 250);
        assert!(config.breakers[1].probe.is_none());
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = parse_config(
            r#"
            [[breakers]]
            name = "cache"
            window_size = 2
            minimum_calls = 4

            [[breakers]]
            name = "cache"
            "#,
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("minimum_calls (4) exceeds window_size (2)"));
        assert!(message.contains("configured more than once"));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("breakers = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
