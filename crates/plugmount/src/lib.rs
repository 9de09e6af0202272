//! # Plugmount
//!
//! Discovers plugins, orders them by priority or by their declared
//! dependencies, and mounts them one at a time into a shared [`Context`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌────────────┐    ┌─────────────┐    ┌──────────────┐
//! │ directories  │───▶│ find       │───▶│ load        │───▶│ mount        │───▶ Context
//! │ plugin refs  │    │ filter     │    │ resolve     │    │ one by one   │     "plugins.ready"
//! │ config file  │    │ exclude    │    │ sort        │    │ after-mount  │
//! └──────────────┘    └────────────┘    └─────────────┘    └──────────────┘
//! ```
//!
//! - **core**: plugin model, [`Context`], dependency graph and sort strategies
//! - **loader**: the [`PluginLoader`] pipeline
//! - **runtime**: configuration, logging and [`PluginRuntime`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plugmount::prelude::*;
//!
//! async fn logger_init(ctx: Arc<Context>, _config: serde_json::Value) -> Result<(), BoxError> {
//!     ctx.insert("logger", Logger::default());
//!     Ok(())
//! }
//!
//! #[distributed_slice(PLUGIN_REGISTRY)]
//! #[linkme(crate = plugmount::linkme)]
//! static LOGGER: PluginDescriptor = define_plugin! {
//!     name: "logger",
//!     init: logger_init,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = PluginRuntime::builder()
//!         .after_mount(|ctx, _| {
//!             ctx.emit(PLUGINS_READY);
//!         })
//!         .build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): `plugmount.toml` configuration files
//! - `yaml-config`: `plugmount.yaml` configuration files
//! - `json-log`: JSON log output

pub use plugmount_core as core;
pub use plugmount_loader as loader;
pub use plugmount_runtime as runtime;

pub use plugmount_core::{
    Bean, BeanConfig, BoxError, Context, PLUGIN_REGISTRY, PLUGINS_READY, PluginDescriptor,
    PluginModule, SortKind, define_plugin, linkme,
};
pub use plugmount_loader::{Catalog, LoadOptions, PluginLoader, PluginRef, PluginRefs};
pub use plugmount_runtime::{PluginRuntime, RuntimeError, RuntimeResult};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use plugmount::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime - main entry point
    pub use plugmount_runtime::{PluginRuntime, RuntimeBuilder};

    // Plugin definition
    pub use plugmount_core::linkme::distributed_slice;
    pub use plugmount_core::{
        BoxError, Context, PLUGIN_REGISTRY, PLUGINS_READY, PluginDescriptor, PluginModule,
        define_plugin,
    };

    // Loader pipeline
    pub use plugmount_core::{DependencyOrder, PriorityOrder, SortKind, SortStrategy};
    pub use plugmount_loader::{Catalog, LoadOptions, PluginLoader, PluginRef, PluginRefs};
}
