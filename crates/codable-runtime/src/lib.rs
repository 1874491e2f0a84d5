//! Codable Runtime - config loading and bootstrap for the Codable framework.
//!
//! This crate provides:
//! - Layered configuration loading with figment (`ConfigLoader`)
//! - Logging initialisation from configuration (`LoggingBuilder`)
//! - Plugin registry bootstrap from the loaded tree (`CodecRuntime`)
//!
//! ```ignore
//! use codable_runtime::CodecRuntime;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = CodecRuntime::builder().profile("production").build()?;
//!     let sink: Option<Box<dyn Sink>> = runtime.decode_path("app.sink")?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LoadedConfig, LoggingConfig, Profile, RuntimeSettings,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{CodecRuntime, RuntimeBuilder, RuntimeStats};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
