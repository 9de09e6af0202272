//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LoaderSection, LogLevel, LoggingConfig, PlugmountConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &PlugmountConfig) -> ConfigResult<()> {
    validate_loader_config(&config.loader)?;
    validate_logging_config(&config.logging)?;

    config
        .plugin_refs()
        .map_err(|e| ConfigError::validation(format!("[plugins]: {e}")))?;

    Ok(())
}

/// Validates the `[loader]` section.
fn validate_loader_config(loader: &LoaderSection) -> ConfigResult<()> {
    if loader.extension.is_empty() {
        return Err(ConfigError::validation("Plugin extension must not be empty"));
    }

    if loader.extension.starts_with('.') {
        return Err(ConfigError::validation(format!(
            "Plugin extension must not start with a dot: {}",
            loader.extension
        )));
    }

    if loader.entry_point.is_empty() {
        return Err(ConfigError::validation("Entry point must not be empty"));
    }

    if loader.patterns.is_empty() {
        return Err(ConfigError::validation(
            "At least one filter pattern is required",
        ));
    }

    Ok(())
}

/// Validates the `[logging]` section.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    let levels = std::iter::once(&logging.level).chain(logging.filters.values());
    for level in levels {
        if level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::validation(format!(
                "Invalid log level: {level}. Valid values are: {:?}",
                LogLevel::ALL.map(|l| l.as_str())
            )));
        }
    }

    Ok(())
}
