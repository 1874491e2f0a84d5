//! Configuration module for the Codable runtime.
//!
//! This module provides layered configuration loading (files, environment,
//! programmatic overrides) and validation of the runtime's own settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, LoadedConfig, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, RUNTIME_KEY, RuntimeSettings,
};
pub use validation::validate_settings;
