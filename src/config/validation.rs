//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TracingConfig → Result<(), Vec<ValidationError>>

use crate::config::schema::TracingConfig;

/// A single semantic problem in a [`TracingConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("component_name must not be empty")]
    EmptyComponentName,

    #[error("excluded path {0:?} must start with '/'")]
    RelativeExcludedPath(String),

    #[error("excluded user agent prefixes must not be empty")]
    EmptyUserAgentPrefix,
}

pub fn validate_config(config: &TracingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.component_name.as_deref() == Some("") {
        errors.push(ValidationError::EmptyComponentName);
    }

    for path in &config.excluded_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativeExcludedPath(path.clone()));
        }
    }

    // An empty prefix would match every client.
    if config.excluded_user_agents.iter().any(String::is_empty) {
        errors.push(ValidationError::EmptyUserAgentPrefix);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
