//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file extension names a format that is unknown or not enabled.
    #[error("Unsupported or disabled configuration file format: .{0}")]
    UnsupportedFormat(String),

    /// Sources could not be merged into the schema.
    #[error("Failed to extract configuration: {0}")]
    ExtractError(#[from] figment::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
