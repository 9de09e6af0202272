//! Configuration module for the plugmount runtime.
//!
//! Layered loading (defaults, files, environment, programmatic overrides)
//! and validation of the `[loader]`, `[plugins]` and `[logging]` sections.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LoaderSection, LogFormat, LogLevel, LogOutput, LoggingConfig, PlugmountConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
