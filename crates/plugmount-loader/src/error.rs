use std::path::PathBuf;

use plugmount_core::{BoxError, SortError};
use thiserror::Error;

/// Errors raised by the plugin loader.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// A plugin directory exists but could not be read.
    #[error("Failed to read plugin directory {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A filter or exclusion pattern is not a valid glob.
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A plugin reference has a shape the normalizer does not accept.
    #[error("Invalid plugin reference: {0}")]
    InvalidReference(String),

    /// A bean's module could not be resolved.
    #[error("Failed to resolve plugin '{id}': {source}")]
    Resolution {
        id: String,
        #[source]
        source: BoxError,
    },

    /// Load-order resolution failed.
    #[error(transparent)]
    Sort(#[from] SortError),

    /// A plugin's mount hook failed; no later plugin was mounted.
    #[error("Error running plugin '{id}': {source}")]
    Mount {
        id: String,
        #[source]
        source: BoxError,
    },
}

impl LoaderError {
    pub fn invalid_reference(msg: impl Into<String>) -> Self {
        Self::InvalidReference(msg.into())
    }

    /// Id of the plugin the error is about, if any.
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            Self::Resolution { id, .. } | Self::Mount { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_error_names_plugin() {
        let err = LoaderError::Mount {
            id: "persistence".into(),
            source: "disk full".into(),
        };
        assert_eq!(err.plugin_id(), Some("persistence"));
        assert_eq!(err.to_string(), "Error running plugin 'persistence': disk full");
    }

    #[test]
    fn test_sort_error_is_transparent() {
        let err = LoaderError::from(SortError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        });
        assert!(err.plugin_id().is_none());
        assert_eq!(err.to_string(), "cyclic dependency found: a -> b -> a");
    }
}
