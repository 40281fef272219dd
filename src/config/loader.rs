//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
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
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::LogFormat;
    use crate::routing::{DuplicatePolicy, NamingCase};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.routing.group, "/");
        assert_eq!(config.routing.duplicate_policy, DuplicatePolicy::FirstWins);
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            [server]
            bind_address = "127.0.0.1:3000"
            request_timeout_secs = 5

            [routing]
            group = "/api"
            naming = "snake"
            duplicate_policy = "last_wins"
            route_table = "generated/routes.toml"

            [docs]
            enabled = true
            out_dir = "target/docs"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
        assert_eq!(config.server.body_limit_bytes, 2 * 1024 * 1024);
        assert_eq!(config.routing.naming, NamingCase::Snake);
        assert_eq!(config.routing.duplicate_policy, DuplicatePolicy::LastWins);
        assert_eq!(config.routing.route_table.as_deref(), Some(Path::new("generated/routes.toml")));
        assert!(config.docs.enabled);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_are_all_reported() {
        let err = parse_config(
            r#"
            [server]
            request_timeout_secs = 0
            [routing]
            group = "api"
            "#,
        )
        .unwrap_err();

        let ConfigError::Validation(errors) = &err else {
            panic!("expected validation error, got {err}");
        };
        assert_eq!(errors.len(), 2);
        assert!(err.to_string().starts_with("Validation failed: "));
    }

    #[test]
    fn test_unknown_naming_is_a_parse_error() {
        let err = parse_config("[routing]\nnaming = \"kebab\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoroute.toml");
        fs::write(&path, "[routing]\ngroup = \"/v2\"\n").unwrap();
        assert_eq!(load_config(&path).unwrap().routing.group, "/v2");

        let missing = load_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
