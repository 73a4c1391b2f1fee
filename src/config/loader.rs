//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::TracingConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
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

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<TracingConfig, ConfigError> {
    let config: TracingConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TracingConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    tracing::info!(
        path = %path.display(),
        component = ?config.component_name,
        excluded_paths = config.excluded_paths.len(),
        "Tracing configuration loaded"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), TracingConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            component_name = "orders-api"
            excluded_paths = ["/health"]
            excluded_user_agents = ["kube-probe"]
            redact_query = true
            "#,
        )
        .unwrap();

        assert_eq!(config.component_name.as_deref(), Some("orders-api"));
        assert_eq!(config.excluded_paths, vec!["/health".to_string()]);
        assert_eq!(config.excluded_user_agents, vec!["kube-probe".to_string()]);
        assert!(config.redact_query);
        assert!(!config.include_path_in_operation_name);
    }

    #[test]
    fn test_rejects_unknown_types() {
        let err = parse_config("redact_query = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = parse_config("excluded_paths = [\"health\"]").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(
                    errors,
                    vec![ValidationError::RelativeExcludedPath("health".into())]
                );
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "component_name = \"from-disk\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.component_name.as_deref(), Some("from-disk"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/tracing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
