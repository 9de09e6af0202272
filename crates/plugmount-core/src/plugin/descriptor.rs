//! Plugin descriptors: static, `Copy` handles to plugin modules.

use linkme::distributed_slice;

use super::PluginModule;

/// A static, `Copy` descriptor that names and instantiates a plugin module.
///
/// Create one with [`define_plugin!`](crate::define_plugin) and either hand it
/// to a catalog directly or contribute it to [`PLUGIN_REGISTRY`] so that it
/// is discovered at link time:
///
/// ```rust,ignore
/// use plugmount_core::linkme::distributed_slice;
/// use plugmount_core::plugin::{PLUGIN_REGISTRY, PluginDescriptor};
///
/// #[distributed_slice(PLUGIN_REGISTRY)]
/// #[linkme(crate = plugmount_core::linkme)]
/// static LOGGER: PluginDescriptor = plugmount_core::define_plugin! {
///     name: "logger",
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    /// Name the module is resolved by (bean id for local plugins, package
    /// name for external ones).
    pub name: &'static str,

    /// Factory that creates the live [`PluginModule`].
    pub create: fn() -> PluginModule,
}

impl PluginDescriptor {
    /// Creates a descriptor. Usable in `static` initialisers.
    pub const fn new(name: &'static str, create: fn() -> PluginModule) -> Self {
        Self { name, create }
    }

    /// Creates the live module from the factory function.
    #[inline]
    pub fn instantiate(&self) -> PluginModule {
        (self.create)()
    }
}

/// Link-time registry of plugin descriptors.
///
/// Every crate linked into the host may contribute entries; a catalog built
/// with `Catalog::collect_all` picks them all up.
#[distributed_slice]
pub static PLUGIN_REGISTRY: [PluginDescriptor];
