//! Runtime error types.

use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The loader failed to discover, load or mount plugins.
    #[error(transparent)]
    Loader(#[from] plugmount_loader::LoaderError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
