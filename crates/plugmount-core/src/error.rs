//! Error types shared by the ordering and mounting stages.

use thiserror::Error;

/// Error type returned by user-supplied hooks (`init`, mount functions).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while ordering a set of beans by their declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    /// The dependency graph contains a cycle.
    #[error("cyclic dependency found: {}", cycle.join(" -> "))]
    CyclicDependency {
        /// Ids along the cycle; the first id is repeated at the end.
        cycle: Vec<String>,
    },

    /// A declared dependency has no matching plugin and implicit
    /// dependencies are disabled.
    #[error("dependency '{dependency}' of plugin '{plugin}' is not a known plugin")]
    UnknownDependency {
        /// The plugin declaring the dependency.
        plugin: String,
        /// The missing dependency id.
        dependency: String,
    },
}

/// Errors raised by the built-in mount dispatch.
#[derive(Debug, Clone, Error)]
pub enum MountError {
    /// The bean was mounted before a module was attached to it.
    #[error("plugin '{id}' has no loaded module")]
    NotLoaded {
        /// Id of the offending bean.
        id: String,
    },
}

/// Result type for ordering operations.
pub type SortResult<T> = Result<T, SortError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = SortError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic dependency found: a -> b -> a");
    }
}
