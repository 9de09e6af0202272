//! Plugmount Runtime - configuration, logging and the plugin runtime.
//!
//! This crate provides:
//! - Layered configuration (`plugmount.toml`, `PLUGMOUNT_*` environment
//!   variables, programmatic overrides)
//! - Logging setup on top of `tracing-subscriber`
//! - [`PluginRuntime`], which builds a loader from the configuration and
//!   mounts the configured plugin directories
//!
//! ```ignore
//! use plugmount_runtime::PluginRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = PluginRuntime::builder().build()?;
//!     let context = runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `toml-config` (default): `plugmount.toml` files
//! - `yaml-config`: `plugmount.yaml` files
//! - `json-log`: the `json` log format

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LoaderSection, LogFormat, LogLevel, LogOutput,
    LoggingConfig, PlugmountConfig, Profile,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{PluginRuntime, RuntimeBuilder};

// Re-export tracing for use by plugin crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the logging macros plugins use:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
