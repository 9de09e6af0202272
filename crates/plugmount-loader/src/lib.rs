//! Discovery, resolution, ordering and mounting of plugins.
//!
//! The entry point is [`PluginLoader`]:
//!
//! ```rust,ignore
//! use plugmount_core::order::SortKind;
//! use plugmount_loader::{Catalog, LoadOptions, PluginLoader};
//!
//! let loader = PluginLoader::builder()
//!     .catalog(Catalog::collect_all())
//!     .sort_kind(SortKind::Dependencies, true)
//!     .build();
//! let context = loader
//!     .mount_directory("./plugins", &LoadOptions::new(), None)
//!     .await?;
//! ```

pub mod catalog;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod handler;
pub mod loader;
pub mod normalize;
pub mod resolver;

pub use catalog::{Catalog, ModuleFactory};
pub use discovery::DirectoryScanner;
pub use error::{LoaderError, LoaderResult};
pub use filter::{DEFAULT_PATTERNS, PatternSet};
pub use handler::{AfterMountFn, DefaultMountHandler, MountHandler};
pub use loader::{LoadOptions, LoaderBuilder, LoaderOptions, PluginLoader};
pub use normalize::{PluginRef, PluginRefs, id_from_path, is_path_like, normalize};
pub use resolver::{CatalogResolver, ModuleResolver, ResolveError, ResolvedModule};
