use std::sync::Arc;

use serde_json::{Map, Value};

use super::module::{InitFn, MountFn, PluginModule, mount_fn};
use crate::context::Context;
use crate::error::BoxError;

// ─── BeanConfig ───────────────────────────────────────────────────────────────

/// Per-bean configuration, tagged by how it takes part in mounting.
///
/// The variant is chosen when the plugin reference is normalized, so mount
/// dispatch never has to inspect the value again.
#[derive(Clone)]
pub enum BeanConfig {
    /// The configuration *is* the mount handler:
    /// `f(plugin, context, merged_config)`.
    Callable(MountFn),

    /// Options plus a mount function that replaces the plugin's own `init`.
    MountCapable {
        /// Called as `mount(plugin, context, merged_config)`.
        mount: MountFn,
        /// Options merged into the config handed to `mount`.
        options: Map<String, Value>,
    },

    /// Plain configuration data.
    Plain(Value),
}

impl BeanConfig {
    /// Wraps an async closure as a [`BeanConfig::Callable`].
    pub fn callable<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<PluginModule>, Arc<Context>, Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::Callable(mount_fn(f))
    }

    /// Wraps options and an async closure as a [`BeanConfig::MountCapable`].
    pub fn with_mount<F, Fut>(options: Map<String, Value>, f: F) -> Self
    where
        F: Fn(Arc<PluginModule>, Arc<Context>, Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::MountCapable {
            mount: mount_fn(f),
            options,
        }
    }

    /// Option map contributed to the merged mount config.
    ///
    /// Only object-shaped data contributes; callables and scalar values
    /// contribute nothing.
    pub fn options(&self) -> Map<String, Value> {
        match self {
            Self::Callable(_) => Map::new(),
            Self::MountCapable { options, .. } => options.clone(),
            Self::Plain(Value::Object(map)) => map.clone(),
            Self::Plain(_) => Map::new(),
        }
    }

    /// Shallow-merges `overrides` on top of [`options`](Self::options);
    /// keys from `overrides` win.
    pub fn merged_with(&self, overrides: &Map<String, Value>) -> Map<String, Value> {
        let mut merged = self.options();
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl Default for BeanConfig {
    fn default() -> Self {
        Self::Plain(Value::Object(Map::new()))
    }
}

impl From<Value> for BeanConfig {
    fn from(value: Value) -> Self {
        Self::Plain(value)
    }
}

impl From<Map<String, Value>> for BeanConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self::Plain(Value::Object(map))
    }
}

impl std::fmt::Debug for BeanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::MountCapable { options, .. } => f
                .debug_struct("MountCapable")
                .field("options", options)
                .finish_non_exhaustive(),
            Self::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
        }
    }
}

// ─── Capability ───────────────────────────────────────────────────────────────

/// The mount behaviour selected for a loaded bean.
///
/// Selection order: callable config, then a config-supplied `mount`, then the
/// module's own `init`, then plain assignment onto the context.
#[derive(Clone)]
pub enum Capability {
    /// Call the bean's config as `f(plugin, context, config)`.
    Callable(MountFn),
    /// Call the config's `mount(plugin, context, config)`.
    MountCapable(MountFn),
    /// Call the module's `init(context, config)`.
    InitCapable(InitFn),
    /// Assign the module's exports onto the context under the bean id.
    Assign,
}

impl Capability {
    /// Selects the capability for `config` applied to `module`.
    pub fn select(config: &BeanConfig, module: &PluginModule) -> Self {
        match config {
            BeanConfig::Callable(f) => Self::Callable(Arc::clone(f)),
            BeanConfig::MountCapable { mount, .. } => Self::MountCapable(Arc::clone(mount)),
            BeanConfig::Plain(_) => match module.init() {
                Some(init) => Self::InitCapable(Arc::clone(init)),
                None => Self::Assign,
            },
        }
    }

    /// Short label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Callable(_) => "callable",
            Self::MountCapable(_) => "mount",
            Self::InitCapable(_) => "init",
            Self::Assign => "assign",
        }
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Bean ─────────────────────────────────────────────────────────────────────

/// The loader's canonical record for one plugin instance.
///
/// A bean starts out unloaded (from the normalizer), gets its module attached
/// during load, has its `priority` rewritten by sorting, and is finally
/// consumed by mount.
#[derive(Clone)]
pub struct Bean {
    /// Stable identifier, unique within one load batch.
    pub id: String,
    /// Resolved source location, or a bare package name.
    pub path: String,
    /// `true` if the module was found on disk rather than as a package.
    pub is_local: bool,
    /// Ordering key; `None` sorts as `0`.
    pub priority: Option<i64>,
    config: BeanConfig,
    plugin: Option<Arc<PluginModule>>,
    capability: Capability,
}

impl Bean {
    /// Creates an unloaded bean.
    pub fn new(id: impl Into<String>, path: impl Into<String>, config: BeanConfig) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            is_local: true,
            priority: None,
            config,
            plugin: None,
            capability: Capability::Assign,
        }
    }

    /// Creates a bean with `module` already attached, using default config.
    pub fn loaded(id: impl Into<String>, module: PluginModule) -> Self {
        let mut bean = Self::new(id, "", BeanConfig::default());
        bean.attach(module, true);
        bean
    }

    /// Builder-style priority setter.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches a loaded module.
    ///
    /// Takes over the module's declared priority and selects the mount
    /// capability once, from the bean config and the module together.
    pub fn attach(&mut self, module: PluginModule, is_local: bool) {
        self.capability = Capability::select(&self.config, &module);
        self.priority = module.priority();
        self.is_local = is_local;
        self.plugin = Some(Arc::new(module));
    }

    /// The bean's configuration.
    pub fn config(&self) -> &BeanConfig {
        &self.config
    }

    /// The attached module, if loaded.
    pub fn plugin(&self) -> Option<&Arc<PluginModule>> {
        self.plugin.as_ref()
    }

    /// `true` once a module is attached.
    pub fn is_loaded(&self) -> bool {
        self.plugin.is_some()
    }

    /// The selected mount capability.
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Dependencies declared by the attached module; empty when unloaded.
    pub fn dependencies(&self) -> &[String] {
        self.plugin
            .as_deref()
            .map(PluginModule::dependencies)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Bean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bean")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("is_local", &self.is_local)
            .field("priority", &self.priority)
            .field("config", &self.config)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_capability_prefers_callable_config() {
        let module = PluginModule::builder("debug")
            .on_init(|_, _| async { Ok(()) })
            .build();
        let config = BeanConfig::callable(|_, _, _| async { Ok(()) });
        assert_eq!(Capability::select(&config, &module).as_str(), "callable");
    }

    #[test]
    fn test_capability_prefers_mount_over_init() {
        let module = PluginModule::builder("repl")
            .on_init(|_, _| async { Ok(()) })
            .build();
        let config = BeanConfig::with_mount(Map::new(), |_, _, _| async { Ok(()) });
        assert_eq!(Capability::select(&config, &module).as_str(), "mount");
    }

    #[test]
    fn test_capability_falls_back_to_init_then_assign() {
        let with_init = PluginModule::builder("a")
            .on_init(|_, _| async { Ok(()) })
            .build();
        let without = PluginModule::builder("b").build();
        let config = BeanConfig::default();

        assert_eq!(Capability::select(&config, &with_init).as_str(), "init");
        assert_eq!(Capability::select(&config, &without).as_str(), "assign");
    }

    #[test]
    fn test_merge_call_site_wins() {
        let config = BeanConfig::from(json!({"level": "info", "color": true}));
        let merged = config.merged_with(&object(json!({"level": "debug"})));

        assert_eq!(merged.get("level"), Some(&json!("debug")));
        assert_eq!(merged.get("color"), Some(&json!(true)));
    }

    #[test]
    fn test_scalar_and_callable_contribute_no_options() {
        assert!(BeanConfig::from(json!("verbose")).options().is_empty());
        assert!(BeanConfig::callable(|_, _, _| async { Ok(()) }).options().is_empty());
    }

    #[test]
    fn test_attach_takes_module_priority_and_dependencies() {
        let mut bean = Bean::new("persistence", "/app/plugins/persistence.js", BeanConfig::default());
        assert!(!bean.is_loaded());
        assert!(bean.dependencies().is_empty());

        let module = PluginModule::builder("persistence")
            .priority(3)
            .depends_on(["logger"])
            .build();
        bean.attach(module, false);

        assert!(bean.is_loaded());
        assert!(!bean.is_local);
        assert_eq!(bean.priority, Some(3));
        assert_eq!(bean.dependencies(), ["logger".to_string()]);
    }
}
