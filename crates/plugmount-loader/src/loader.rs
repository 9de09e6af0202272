//! The plugin loader.
//!
//! A load runs in four stages, each callable on its own:
//!
//! ```text
//! find(dir) ─▶ filter / exclude ─▶ load(refs) ─▶ mount(beans, config)
//!   scan        glob patterns       normalize,     one bean at a time,
//!                                   resolve, sort  then after-mount
//! ```
//!
//! [`PluginLoader::mount_directory`] chains all of them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugmount_core::Context;
use plugmount_core::order::{PriorityOrder, SortKind, SortStrategy};
use plugmount_core::plugin::Bean;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::discovery::DirectoryScanner;
use crate::error::{LoaderError, LoaderResult};
use crate::filter::{DEFAULT_PATTERNS, PatternSet};
use crate::handler::{AfterMountFn, DefaultMountHandler, MountHandler};
use crate::normalize::{PluginRefs, normalize};
use crate::resolver::{CatalogResolver, ModuleResolver};

// ─── Options ──────────────────────────────────────────────────────────────────

/// Loader-wide settings fixed at construction.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Base directory for relative plugin paths and directories.
    pub basepath: PathBuf,
    /// Plugin file extension, without the leading dot.
    pub extension: String,
    /// File name, without extension, that marks a directory as a plugin.
    pub entry_point: String,
    /// Patterns used by [`PluginLoader::filter`].
    pub patterns: Vec<String>,
    /// Exclusions applied by every [`PluginLoader::mount_directory`] call.
    pub exclude: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            basepath: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            extension: "js".to_string(),
            entry_point: "index".to_string(),
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            exclude: Vec::new(),
        }
    }
}

/// Per-call settings for [`PluginLoader::load`] and
/// [`PluginLoader::mount_directory`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Extra plugins appended to the batch.
    pub plugins: PluginRefs,
    /// Overrides the loader's base path when normalizing.
    pub basepath: Option<PathBuf>,
    /// Extra exclusions for directory mounts.
    pub exclude: Vec<String>,
    /// Call-site config handed to every mount.
    pub config: Map<String, Value>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plugins(mut self, plugins: impl Into<PluginRefs>) -> Self {
        self.plugins = plugins.into();
        self
    }

    pub fn basepath(mut self, basepath: impl Into<PathBuf>) -> Self {
        self.basepath = Some(basepath.into());
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }
}

// ─── PluginLoader ─────────────────────────────────────────────────────────────

/// Discovers, orders and mounts plugins into a [`Context`].
pub struct PluginLoader {
    options: LoaderOptions,
    scanner: DirectoryScanner,
    resolver: Arc<dyn ModuleResolver>,
    sort: Arc<dyn SortStrategy>,
    handler: Arc<dyn MountHandler>,
    after_mount: Option<AfterMountFn>,
    context: Arc<Context>,
}

impl PluginLoader {
    /// Creates a loader with default options over `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        Self::builder().catalog(catalog).build()
    }

    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::default()
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// The context used when [`mount`](Self::mount) is given none.
    pub fn context(&self) -> Arc<Context> {
        Arc::clone(&self.context)
    }

    /// Name of the configured sort strategy.
    pub fn sort_strategy(&self) -> &'static str {
        self.sort.name()
    }

    /// Lists plugin candidates in `directory`, relative to the base path.
    pub async fn find(&self, directory: impl AsRef<Path>) -> LoaderResult<Vec<PathBuf>> {
        self.scanner
            .scan(directory.as_ref(), &self.options.basepath)
            .await
    }

    /// Applies the configured include/exclude patterns to `paths`.
    pub fn filter(&self, paths: Vec<PathBuf>) -> LoaderResult<Vec<PathBuf>> {
        Ok(PatternSet::new(&self.options.patterns)?.apply(paths))
    }

    /// Applies explicit `patterns` to `paths`.
    pub fn filter_with<I, S>(&self, paths: Vec<PathBuf>, patterns: I) -> LoaderResult<Vec<PathBuf>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(PatternSet::new(patterns)?.apply(paths))
    }

    /// Removes the paths matching any of `patterns`.
    pub fn exclude<I, S>(&self, paths: Vec<PathBuf>, patterns: I) -> LoaderResult<Vec<PathBuf>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(PatternSet::exclusion(patterns)?.apply(paths))
    }

    /// Normalizes `plugins`, resolves every module and sorts the batch.
    ///
    /// Resolution is sequential and stops at the first failure.
    pub async fn load(
        &self,
        plugins: impl Into<PluginRefs>,
        options: &LoadOptions,
    ) -> LoaderResult<Vec<Bean>> {
        let mut refs = plugins.into();
        if refs.is_empty() {
            warn!("No plugins given to load");
        }
        refs.extend(options.plugins.clone());

        let basepath = options
            .basepath
            .as_deref()
            .unwrap_or(&self.options.basepath);
        let mut beans = normalize(refs, basepath);

        for bean in &mut beans {
            if bean.is_loaded() {
                debug!(plugin = %bean.id, "Using inline plugin module");
                continue;
            }

            let resolved = self
                .resolver
                .resolve(bean)
                .await
                .map_err(|source| LoaderError::Resolution {
                    id: bean.id.clone(),
                    source,
                })?;
            debug!(
                plugin = %bean.id,
                path = %bean.path,
                is_local = resolved.is_local,
                "Plugin module resolved"
            );
            bean.attach(resolved.module, resolved.is_local);
        }

        self.sort(&mut beans)?;
        info!(
            count = beans.len(),
            strategy = self.sort.name(),
            "Plugins loaded"
        );
        Ok(beans)
    }

    /// Reorders `beans` with the configured strategy.
    pub fn sort(&self, beans: &mut [Bean]) -> LoaderResult<()> {
        self.sort.sort(beans)?;
        Ok(())
    }

    /// Mounts `beans` in order into `context`, or the loader's own context.
    ///
    /// Each mount completes before the next begins. The first failure stops
    /// the batch; the after-mount hook runs only if every bean mounted.
    pub async fn mount(
        &self,
        beans: &[Bean],
        config: &Map<String, Value>,
        context: Option<Arc<Context>>,
    ) -> LoaderResult<Arc<Context>> {
        let context = context.unwrap_or_else(|| self.context());
        if beans.is_empty() {
            warn!("No plugins to mount");
        }

        for bean in beans {
            debug!(
                plugin = %bean.id,
                capability = bean.capability().as_str(),
                "Mounting plugin"
            );
            if let Err(source) = self.handler.mount(bean, Arc::clone(&context), config).await {
                error!(plugin = %bean.id, error = %source, "Plugin failed to mount");
                return Err(LoaderError::Mount {
                    id: bean.id.clone(),
                    source,
                });
            }
            info!(plugin = %bean.id, "Plugin mounted");
        }

        if let Some(after_mount) = &self.after_mount {
            after_mount(&context, config);
        }
        Ok(context)
    }

    /// Finds, filters, loads and mounts every plugin in `directory`.
    pub async fn mount_directory(
        &self,
        directory: impl AsRef<Path>,
        options: &LoadOptions,
        context: Option<Arc<Context>>,
    ) -> LoaderResult<Arc<Context>> {
        let directory = directory.as_ref();
        let found = self.find(directory).await?;
        let filtered = self.filter(found)?;
        let filtered = self.exclude(
            filtered,
            self.options.exclude.iter().chain(options.exclude.iter()),
        )?;
        debug!(
            directory = %directory.display(),
            count = filtered.len(),
            "Plugin candidates discovered"
        );

        let beans = self.load(PluginRefs::from(filtered), options).await?;
        self.mount(&beans, &options.config, context).await
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("options", &self.options)
            .field("sort", &self.sort.name())
            .field("has_after_mount", &self.after_mount.is_some())
            .finish_non_exhaustive()
    }
}

// ─── LoaderBuilder ────────────────────────────────────────────────────────────

/// Builder for [`PluginLoader`].
pub struct LoaderBuilder {
    options: LoaderOptions,
    catalog: Catalog,
    resolver: Option<Arc<dyn ModuleResolver>>,
    sort: Arc<dyn SortStrategy>,
    handler: Arc<dyn MountHandler>,
    after_mount: Option<AfterMountFn>,
    context: Option<Arc<Context>>,
}

impl Default for LoaderBuilder {
    fn default() -> Self {
        Self {
            options: LoaderOptions::default(),
            catalog: Catalog::new(),
            resolver: None,
            sort: Arc::new(PriorityOrder),
            handler: Arc::new(DefaultMountHandler),
            after_mount: None,
            context: None,
        }
    }
}

impl LoaderBuilder {
    pub fn options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn basepath(mut self, basepath: impl Into<PathBuf>) -> Self {
        self.options.basepath = basepath.into();
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.options.extension = extension.into();
        self
    }

    pub fn entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.options.entry_point = entry_point.into();
        self
    }

    /// Modules available to the default resolver.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replaces the default [`CatalogResolver`].
    pub fn resolver(mut self, resolver: impl ModuleResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn sort_strategy(mut self, strategy: impl SortStrategy + 'static) -> Self {
        self.sort = Arc::new(strategy);
        self
    }

    /// Picks a built-in strategy by kind.
    pub fn sort_kind(mut self, kind: SortKind, allow_implicits: bool) -> Self {
        self.sort = kind.strategy(allow_implicits);
        self
    }

    pub fn mount_handler(mut self, handler: impl MountHandler + 'static) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    /// Hook run once after a batch mounted without failure.
    pub fn after_mount<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, &Map<String, Value>) + Send + Sync + 'static,
    {
        self.after_mount = Some(Arc::new(f));
        self
    }

    /// Default mount target.
    pub fn context(mut self, context: Arc<Context>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn build(self) -> PluginLoader {
        let resolver: Arc<dyn ModuleResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(CatalogResolver::new(
                self.catalog,
                self.options.basepath.clone(),
                self.options.extension.clone(),
            )),
        };
        let scanner = DirectoryScanner::new(&self.options.extension, &self.options.entry_point);

        PluginLoader {
            scanner,
            resolver,
            sort: self.sort,
            handler: self.handler,
            after_mount: self.after_mount,
            context: self.context.unwrap_or_else(|| Arc::new(Context::new())),
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use parking_lot::Mutex;
    use plugmount_core::plugin::{BeanConfig, PluginModule};
    use plugmount_core::{PLUGINS_READY, SortError};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::normalize::PluginRef;

    type Log = Arc<Mutex<Vec<String>>>;

    fn ids(beans: &[Bean]) -> Vec<&str> {
        beans.iter().map(|b| b.id.as_str()).collect()
    }

    /// A module whose `init` records its name into `log`.
    fn recording(name: &'static str, deps: &[&'static str], log: &Log) -> PluginModule {
        let log = Arc::clone(log);
        PluginModule::builder(name)
            .depends_on(deps.iter().copied())
            .on_init(move |ctx, _config| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().push(name.to_string());
                    ctx.insert(name, true);
                    Ok(())
                }
            })
            .build()
    }

    fn app_catalog(log: &Log) -> Catalog {
        let plugins: [(&'static str, &'static [&'static str]); 5] = [
            ("authentication", &["logger", "persistence"]),
            ("logger", &[]),
            ("persistence", &["logger"]),
            ("pubsub", &["logger"]),
            ("repl", &["logger"]),
        ];

        let mut catalog = Catalog::new();
        for (name, deps) in plugins {
            let log = Arc::clone(log);
            catalog.register_fn(name, move || recording(name, deps, &log));
        }
        catalog
    }

    fn app_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        let plugins = temp.path().join("plugins");
        fs::create_dir_all(plugins.join("authentication")).unwrap();
        fs::write(plugins.join("authentication/index.js"), "").unwrap();
        for file in ["logger.js", "persistence.js", "pubsub.js", "repl.js"] {
            fs::write(plugins.join(file), "").unwrap();
        }
        fs::create_dir_all(plugins.join("node_modules")).unwrap();
        fs::write(plugins.join("node_modules/index.js"), "").unwrap();
        temp
    }

    #[tokio::test]
    async fn test_mount_directory_in_dependency_order() {
        let log: Log = Arc::default();
        let temp = app_dir();
        let ready = Arc::new(Mutex::new(0));
        let ready_hook = Arc::clone(&ready);

        let loader = PluginLoader::builder()
            .basepath(temp.path())
            .catalog(app_catalog(&log))
            .sort_kind(SortKind::Dependencies, true)
            .after_mount(move |ctx, _config| {
                *ready_hook.lock() += 1;
                ctx.emit(PLUGINS_READY);
            })
            .build();

        let mut events = loader.context().subscribe();
        let ctx = loader
            .mount_directory("plugins", &LoadOptions::new(), None)
            .await
            .unwrap();

        assert_eq!(
            *log.lock(),
            ["logger", "persistence", "authentication", "pubsub", "repl"]
        );
        assert!(ctx.contains("repl"));
        assert_eq!(*ready.lock(), 1);
        assert_eq!(events.try_recv().unwrap(), PLUGINS_READY);
    }

    #[tokio::test]
    async fn test_priority_order_is_the_default() {
        let log: Log = Arc::default();
        let temp = app_dir();
        let loader = PluginLoader::builder()
            .basepath(temp.path())
            .catalog(app_catalog(&log))
            .build();

        assert_eq!(loader.sort_strategy(), "priority");
        loader
            .mount_directory("plugins", &LoadOptions::new(), None)
            .await
            .unwrap();

        // No priorities are declared, so discovery order is kept.
        assert_eq!(
            *log.lock(),
            ["authentication", "logger", "persistence", "pubsub", "repl"]
        );
    }

    #[tokio::test]
    async fn test_mount_directory_honours_exclusions() {
        let log: Log = Arc::default();
        let temp = app_dir();
        let loader = PluginLoader::builder()
            .basepath(temp.path())
            .catalog(app_catalog(&log))
            .build();

        let options = LoadOptions::new().exclude(["repl.js", "!pubsub.js"]);
        loader
            .mount_directory("plugins", &options, None)
            .await
            .unwrap();

        assert_eq!(*log.lock(), ["authentication", "logger", "persistence"]);
    }

    #[tokio::test]
    async fn test_missing_directory_mounts_nothing() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(Mutex::new(0));
        let hook_calls = Arc::clone(&calls);
        let loader = PluginLoader::builder()
            .basepath(temp.path())
            .after_mount(move |_, _| *hook_calls.lock() += 1)
            .build();

        assert!(loader.find("absent").await.unwrap().is_empty());
        let ctx = loader
            .mount_directory("absent", &LoadOptions::new(), None)
            .await
            .unwrap();

        assert!(ctx.is_empty());
        assert_eq!(*calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_load_appends_option_plugins() {
        let catalog = Catalog::new()
            .with_fn("logger", || PluginModule::builder("logger").priority(-1).build())
            .with_fn("debug", || PluginModule::builder("debug").build());
        let loader = PluginLoader::new(catalog);

        let options = LoadOptions::new().plugins("debug");
        let beans = loader.load("logger", &options).await.unwrap();

        assert_eq!(ids(&beans), ["logger", "debug"]);
        assert!(beans.iter().all(|b| !b.is_local));
    }

    #[tokio::test]
    async fn test_load_stops_at_first_unresolvable() {
        let loader = PluginLoader::new(Catalog::new().with_fn("logger", || {
            PluginModule::builder("logger").build()
        }));

        let err = loader
            .load(vec!["logger", "ghost", "also-missing"], &LoadOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LoaderError::Resolution { ref id, .. } if id == "ghost"));
    }

    #[tokio::test]
    async fn test_load_reports_cycles() {
        let catalog = Catalog::new()
            .with_fn("a", || PluginModule::builder("a").depends_on(["b"]).build())
            .with_fn("b", || PluginModule::builder("b").depends_on(["a"]).build());
        let loader = PluginLoader::builder()
            .catalog(catalog)
            .sort_kind(SortKind::Dependencies, true)
            .build();

        let err = loader
            .load(vec!["a", "b"], &LoadOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Sort(SortError::CyclicDependency { .. })
        ));
    }

    #[tokio::test]
    async fn test_implicit_dependency_does_not_join_batch() {
        let catalog = Catalog::new().with_fn("pubsub", || {
            PluginModule::builder("pubsub").depends_on(["redis"]).build()
        });
        let loader = PluginLoader::builder()
            .catalog(catalog)
            .sort_kind(SortKind::Dependencies, true)
            .build();

        let beans = loader.load("pubsub", &LoadOptions::new()).await.unwrap();
        assert_eq!(ids(&beans), ["pubsub"]);

        let strict = PluginLoader::builder()
            .catalog(Catalog::new().with_fn("pubsub", || {
                PluginModule::builder("pubsub").depends_on(["redis"]).build()
            }))
            .sort_kind(SortKind::Dependencies, false)
            .build();
        let err = strict.load("pubsub", &LoadOptions::new()).await.unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Sort(SortError::UnknownDependency { .. })
        ));
    }

    #[tokio::test]
    async fn test_mount_failure_halts_pipeline() {
        let invoked = Arc::new(Mutex::new(Vec::new()));
        let after = Arc::new(Mutex::new(false));

        let module = |name: &'static str, fail: bool, invoked: &Arc<Mutex<Vec<&'static str>>>| {
            let invoked = Arc::clone(invoked);
            PluginModule::builder(name)
                .on_init(move |_ctx, _config| {
                    let invoked = Arc::clone(&invoked);
                    async move {
                        invoked.lock().push(name);
                        if fail {
                            return Err("storage offline".into());
                        }
                        Ok(())
                    }
                })
                .build()
        };

        let after_hook = Arc::clone(&after);
        let loader = PluginLoader::builder()
            .after_mount(move |_, _| *after_hook.lock() = true)
            .build();
        let beans = vec![
            Bean::loaded("logger", module("logger", false, &invoked)),
            Bean::loaded("persistence", module("persistence", true, &invoked)),
            Bean::loaded("repl", module("repl", false, &invoked)),
        ];

        let err = loader.mount(&beans, &Map::new(), None).await.unwrap_err();

        assert_eq!(err.plugin_id(), Some("persistence"));
        assert!(err.to_string().contains("storage offline"));
        assert_eq!(*invoked.lock(), ["logger", "persistence"]);
        assert!(!*after.lock());
    }

    #[tokio::test]
    async fn test_init_runs_once_with_merged_config() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let module = PluginModule::builder("logger")
            .on_init(move |_ctx, config| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().push(config);
                    Ok(())
                }
            })
            .build();

        let loader = PluginLoader::new(Catalog::new());
        let beans = loader
            .load(
                PluginRef::inline("logger", module).with_config(json!({"level": "info"})),
                &LoadOptions::new(),
            )
            .await
            .unwrap();

        let config = match json!({"color": false}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        loader.mount(&beans, &config, None).await.unwrap();

        assert_eq!(*seen.lock(), [json!({"level": "info", "color": false})]);
    }

    #[tokio::test]
    async fn test_callable_config_skips_init() {
        let init_calls = Arc::new(Mutex::new(0));
        let callable_calls = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&init_calls);
        let catalog = Catalog::new().with_fn("debug", move || {
            let counter = Arc::clone(&counter);
            PluginModule::builder("debug")
                .on_init(move |_ctx, _config| {
                    let counter = Arc::clone(&counter);
                    async move {
                        *counter.lock() += 1;
                        Ok(())
                    }
                })
                .build()
        });

        let counter = Arc::clone(&callable_calls);
        let refs = PluginRef::configured(
            "debug",
            BeanConfig::callable(move |_plugin, _ctx, _config| {
                let counter = Arc::clone(&counter);
                async move {
                    *counter.lock() += 1;
                    Ok(())
                }
            }),
        );

        let loader = PluginLoader::new(catalog);
        let beans = loader.load(refs, &LoadOptions::new()).await.unwrap();
        loader.mount(&beans, &Map::new(), None).await.unwrap();

        assert_eq!(*callable_calls.lock(), 1);
        assert_eq!(*init_calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_mount_into_given_context() {
        let loader = PluginLoader::new(
            Catalog::new().with_fn("version", || {
                PluginModule::builder("version").exports(3_u32).build()
            }),
        );
        let beans = loader.load("version", &LoadOptions::new()).await.unwrap();

        let host = Arc::new(Context::named("host"));
        let ctx = loader
            .mount(&beans, &Map::new(), Some(Arc::clone(&host)))
            .await
            .unwrap();

        assert_eq!(ctx.name(), "host");
        assert_eq!(host.get::<u32>("version").as_deref(), Some(&3));
        assert!(loader.context().is_empty());
    }

    #[test]
    fn test_filter_uses_configured_patterns() {
        let loader = PluginLoader::builder()
            .options(LoaderOptions {
                patterns: vec!["*.js".into(), "!debug.js".into()],
                ..LoaderOptions::default()
            })
            .build();

        let kept = loader
            .filter(vec![
                PathBuf::from("/p/debug.js"),
                PathBuf::from("/p/logger.js"),
                PathBuf::from("/p/notes.txt"),
            ])
            .unwrap();
        assert_eq!(kept, [PathBuf::from("/p/logger.js")]);
    }
}
