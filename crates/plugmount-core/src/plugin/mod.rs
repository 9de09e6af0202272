//! Plugin data model.
//!
//! # Architecture
//!
//! - A [`PluginModule`] is the loaded unit of plugin code: an optional
//!   priority, a list of declared dependencies, an optional async `init`
//!   hook and an optional exported value.
//! - A [`PluginDescriptor`] is the *static, `Copy` handle* to a module: a
//!   name and a factory function pointer. Descriptors live in catalogs or
//!   in the link-time [`PLUGIN_REGISTRY`].
//! - A [`Bean`] is one plugin *instance* in a load batch: id, path,
//!   [`BeanConfig`], the attached module and the selected [`Capability`].
//!
//! # Mount capability
//!
//! How a bean is mounted is decided once, when its module is attached:
//!
//! | Bean config | Module | Capability |
//! |-------------|--------|------------|
//! | `Callable(f)` | any | `f(plugin, context, config)` |
//! | `MountCapable { mount, .. }` | any | `mount(plugin, context, config)` |
//! | `Plain(_)` | has `init` | `init(context, config)` |
//! | `Plain(_)` | no `init` | assign exports onto the context |

pub mod bean;
pub mod descriptor;
pub mod macros;
pub mod module;

pub use bean::{Bean, BeanConfig, Capability};
pub use descriptor::{PLUGIN_REGISTRY, PluginDescriptor};
pub use module::{InitFn, MountFn, PluginModule, PluginModuleBuilder, init_fn, mount_fn};
