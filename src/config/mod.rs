//! Declarative middleware configuration.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TracingConfig (validated, immutable)
//!     → into_options() → MiddlewareOption list → Settings
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so an empty file is a valid config
//! - Code options passed after the config options override them
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::TracingConfig;
pub use validation::{validate_config, ValidationError};
