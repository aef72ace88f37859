//! Configuration module for the Gale runtime.
//!
//! This module provides layered configuration loading (defaults, TOML files,
//! `GALE_*` environment variables, programmatic overrides) and validation for
//! the server and logging settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    GaleConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, ServerConfig, SpanEvents,
};
pub use validation::validate_config;
