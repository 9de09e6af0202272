//! Configuration-driven plugin runtime.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use plugmount_runtime::PluginRuntime;
//!
//! // Searches for plugmount.toml in the working directory
//! let runtime = PluginRuntime::builder().build()?;
//! let context = runtime.run().await?;
//!
//! // Custom configuration path
//! let runtime = PluginRuntime::builder()
//!     .config_file("config/plugmount.toml")
//!     .profile("production")
//!     .build()?;
//! ```

use std::path::Path;
use std::sync::Arc;

use plugmount_core::Context;
use plugmount_loader::{AfterMountFn, Catalog, LoadOptions, PluginLoader, PluginRefs};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::{ConfigLoader, PlugmountConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// A [`PluginLoader`] wired from a [`PlugmountConfig`].
///
/// ```rust,ignore
/// let runtime = PluginRuntime::builder()
///     .catalog(Catalog::collect_all())
///     .after_mount(|ctx, _| {
///         ctx.emit(PLUGINS_READY);
///     })
///     .build()?;
///
/// runtime.run().await?;
/// ```
pub struct PluginRuntime {
    config: PlugmountConfig,
    /// Parsed `[plugins]` section.
    plugins: PluginRefs,
    loader: PluginLoader,
}

impl PluginRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration, using every
    /// plugin in the link-time registry.
    ///
    /// Logging is initialized from the configuration.
    pub fn from_config(config: PlugmountConfig) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);
        Self::assemble(config, Catalog::collect_all(), None, None)
    }

    fn assemble(
        config: PlugmountConfig,
        catalog: Catalog,
        context: Option<Arc<Context>>,
        after_mount: Option<AfterMountFn>,
    ) -> RuntimeResult<Self> {
        validate_config(&config)?;
        let plugins = config.plugin_refs()?;

        let mut builder = PluginLoader::builder()
            .options(config.loader.to_options())
            .catalog(catalog)
            .sort_kind(config.loader.sort, config.loader.allow_implicits);
        if let Some(context) = context {
            builder = builder.context(context);
        }
        if let Some(hook) = after_mount {
            builder = builder.after_mount(move |ctx, config| hook(ctx, config));
        }
        let loader = builder.build();

        info!(
            basepath = %loader.options().basepath.display(),
            directories = config.loader.directories.len(),
            plugins = plugins.len(),
            sort = loader.sort_strategy(),
            "Plugin runtime ready"
        );

        Ok(Self {
            config,
            plugins,
            loader,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PlugmountConfig {
        &self.config
    }

    /// Returns the underlying loader.
    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    /// Returns the mount target.
    pub fn context(&self) -> Arc<Context> {
        self.loader.context()
    }

    /// Mounts every configured directory in order.
    ///
    /// The `[plugins]` section joins the first directory's batch, so it is
    /// sorted together with it. Without directories it is mounted on its own.
    pub async fn run(&self) -> RuntimeResult<Arc<Context>> {
        let directories = &self.config.loader.directories;
        if directories.is_empty() {
            if self.plugins.is_empty() {
                warn!("No plugin directories or plugins configured");
                return Ok(self.context());
            }
            return self.load_and_mount(self.plugins.clone()).await;
        }

        for (index, directory) in directories.iter().enumerate() {
            let mut options = LoadOptions::new();
            if index == 0 {
                options = options.plugins(self.plugins.clone());
            }
            self.mount_directory(directory, &options).await?;
        }

        info!(directories = directories.len(), "Plugin directories mounted");
        Ok(self.context())
    }

    /// Mounts a single directory into the runtime context.
    pub async fn mount_directory(
        &self,
        directory: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> RuntimeResult<Arc<Context>> {
        Ok(self
            .loader
            .mount_directory(directory, options, None)
            .await?)
    }

    /// Loads and mounts an explicit plugin list into the runtime context.
    pub async fn load_and_mount(
        &self,
        plugins: impl Into<PluginRefs>,
    ) -> RuntimeResult<Arc<Context>> {
        let beans = self.loader.load(plugins, &LoadOptions::new()).await?;
        Ok(self.loader.mount(&beans, &Map::new(), None).await?)
    }
}

impl std::fmt::Debug for PluginRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRuntime")
            .field("config", &self.config)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`PluginRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    catalog: Option<Catalog>,
    context: Option<Arc<Context>>,
    after_mount: Option<AfterMountFn>,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            catalog: None,
            context: None,
            after_mount: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Forces development mode on or off.
    pub fn development(mut self, enabled: bool) -> Self {
        self.config_loader = self.config_loader.development(enabled);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a base configuration below files and environment.
    pub fn merge(mut self, config: PlugmountConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Overrides a single key, e.g. `set("loader.sort", "dependencies")`.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Uses `catalog` instead of the link-time registry.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Mount target shared with the host.
    pub fn context(mut self, context: Arc<Context>) -> Self {
        self.context = Some(context);
        self
    }

    /// Hook run after each batch mounted without failure.
    pub fn after_mount<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, &Map<String, Value>) + Send + Sync + 'static,
    {
        self.after_mount = Some(Arc::new(f));
        self
    }

    /// Leaves subscriber setup to the host.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> RuntimeResult<PluginRuntime> {
        let config = self.config_loader.load()?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let catalog = self.catalog.unwrap_or_else(Catalog::collect_all);
        PluginRuntime::assemble(config, catalog, self.context, self.after_mount)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
