//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, RuntimeSettings};

/// Validates the runtime settings.
pub fn validate_settings(settings: &RuntimeSettings) -> ConfigResult<()> {
    validate_logging_config(&settings.logging)?;
    validate_plugins_path(&settings.plugins)?;
    Ok(())
}

/// Validates logging configuration.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        match &logging.file_path {
            None => return Err(ConfigError::missing_field("runtime.logging.file_path")),
            Some(path) if path.file_name().is_none() => {
                return Err(ConfigError::validation(format!(
                    "Log file path must name a file: {}",
                    path.display()
                )));
            }
            Some(_) => {}
        }
    }

    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(|c: char| c.is_whitespace() || c == '=' || c == ',') {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: '{target}'"
            )));
        }
    }

    Ok(())
}

/// Validates the dotted path of the plugins section.
fn validate_plugins_path(path: &str) -> ConfigResult<()> {
    if path.is_empty() {
        return Err(ConfigError::missing_field("runtime.plugins"));
    }
    if path.split('.').any(str::is_empty) {
        return Err(ConfigError::validation(format!(
            "Plugins path has an empty segment: '{path}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_settings() {
        assert!(validate_settings(&RuntimeSettings::default()).is_ok());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut settings = RuntimeSettings::default();
        settings.logging.output = LogOutput::File;
        assert!(matches!(
            validate_settings(&settings),
            Err(ConfigError::MissingField { .. })
        ));

        settings.logging.file_path = Some(PathBuf::from("logs/codable.log"));
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_invalid_filter_target() {
        let mut settings = RuntimeSettings::default();
        settings
            .logging
            .filters
            .insert("codable core".to_string(), LogLevel::Debug);
        assert!(matches!(
            validate_settings(&settings),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_invalid_plugins_path() {
        let mut settings = RuntimeSettings::default();
        settings.plugins = "app..plugins".to_string();
        assert!(validate_settings(&settings).is_err());

        settings.plugins = String::new();
        assert!(matches!(
            validate_settings(&settings),
            Err(ConfigError::MissingField { .. })
        ));

        settings.plugins = "app.plugins".to_string();
        assert!(validate_settings(&settings).is_ok());
    }
}
