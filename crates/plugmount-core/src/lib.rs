//! # Plugmount Core
//!
//! The data model and load-order resolution of the plugmount plugin loader.
//!
//! ## Pipeline
//!
//! ```text
//! plugin refs ──▶ Beans ──▶ attach modules ──▶ SortStrategy ──▶ mount into Context
//!                             (loader)          (this crate)        (loader)
//! ```
//!
//! This crate owns everything that does not touch the filesystem:
//!
//! - **Plugin model**: [`PluginModule`], [`PluginDescriptor`], [`Bean`],
//!   [`BeanConfig`] and the mount [`Capability`] selected per bean.
//! - **Host context**: [`Context`], the shared object plugins mount into.
//! - **Ordering**: the dependency graph, the weight resolver, the cycle
//!   finder, and the [`SortStrategy`] implementations.
//!
//! ## Example
//!
//! ```rust,ignore
//! use plugmount_core::{Bean, DependencyOrder, PluginModule, SortStrategy};
//!
//! let mut beans = vec![
//!     Bean::loaded("pubsub", PluginModule::builder("pubsub").depends_on(["logger"]).build()),
//!     Bean::loaded("logger", PluginModule::builder("logger").build()),
//! ];
//! DependencyOrder::new().sort(&mut beans)?;
//! assert_eq!(beans[0].id, "logger");
//! ```

pub mod context;
pub mod error;
pub mod order;
pub mod plugin;

pub use context::{Context, ContextValue, PLUGINS_READY};
pub use error::{BoxError, MountError, SortError, SortResult};
pub use order::{
    DependencyGraph, DependencyOrder, ImplicitDependency, PriorityOrder, SortKind, SortStrategy,
    Weight, WeightStack, build_graph, compute_weights, find_cycle, sort_by_dependencies,
};
pub use plugin::{
    Bean, BeanConfig, Capability, InitFn, MountFn, PLUGIN_REGISTRY, PluginDescriptor,
    PluginModule, PluginModuleBuilder, init_fn, mount_fn,
};

// Re-exported so `#[distributed_slice(PLUGIN_REGISTRY)]` works without a
// direct linkme dependency.
pub use linkme;
