//! Runtime error types.

use codable_core::{DecodeError, RegistryError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while bootstrapping or using the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A plugin category could not be built.
    #[error("Failed to build plugin registries: {0}")]
    Registry(#[from] RegistryError),

    /// A decode call failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
