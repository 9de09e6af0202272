//! The set of plugin modules a loader can resolve.
//!
//! A catalog maps names to module factories. Names are bean ids for local
//! plugins and package names for external ones.

use std::collections::HashMap;
use std::sync::Arc;

use plugmount_core::plugin::{PLUGIN_REGISTRY, PluginDescriptor, PluginModule};
use tracing::{debug, warn};

/// Creates a fresh [`PluginModule`].
pub type ModuleFactory = Arc<dyn Fn() -> PluginModule + Send + Sync>;

#[derive(Clone, Default)]
pub struct Catalog {
    factories: HashMap<String, ModuleFactory>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every descriptor contributed to [`PLUGIN_REGISTRY`].
    ///
    /// If several descriptors share a name the first one linked is used.
    pub fn collect_all() -> Self {
        let mut catalog = Self::new();
        for descriptor in PLUGIN_REGISTRY.iter() {
            if catalog.contains(descriptor.name) {
                warn!(
                    plugin = descriptor.name,
                    "Multiple plugin modules registered under one name, using first"
                );
                continue;
            }
            catalog.insert(descriptor.name, descriptor.create);
        }
        debug!(count = catalog.len(), "Collected registered plugin modules");
        catalog
    }

    /// Adds a descriptor, replacing any module of the same name.
    pub fn register(&mut self, descriptor: PluginDescriptor) -> &mut Self {
        self.insert(descriptor.name, descriptor.create);
        self
    }

    /// Adds a factory closure under `name`, replacing any module of the same name.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> PluginModule + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, descriptor: PluginDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Builder-style [`register_fn`](Self::register_fn).
    pub fn with_fn<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> PluginModule + Send + Sync + 'static,
    {
        self.register_fn(name, factory);
        self
    }

    /// Creates the module registered under `name`.
    pub fn instantiate(&self, name: &str) -> Option<PluginModule> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    fn insert(&mut self, name: &str, create: fn() -> PluginModule) {
        self.factories.insert(name.to_string(), Arc::new(create));
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("plugins", &self.names())
            .finish()
    }
}
