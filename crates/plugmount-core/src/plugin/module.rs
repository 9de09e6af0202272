use std::any::Any;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::context::{Context, ContextValue};
use crate::error::BoxError;

// ─── Hook types ───────────────────────────────────────────────────────────────

/// A plugin's own `init` hook: `init(context, merged_config)`.
pub type InitFn =
    Arc<dyn Fn(Arc<Context>, Value) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// A configuration-supplied mount function: `mount(plugin, context, merged_config)`.
pub type MountFn = Arc<
    dyn Fn(Arc<PluginModule>, Arc<Context>, Value) -> BoxFuture<'static, Result<(), BoxError>>
        + Send
        + Sync,
>;

/// Wraps an async closure into an [`InitFn`].
pub fn init_fn<F, Fut>(f: F) -> InitFn
where
    F: Fn(Arc<Context>, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |ctx, config| Box::pin(f(ctx, config)))
}

/// Wraps an async closure into a [`MountFn`].
pub fn mount_fn<F, Fut>(f: F) -> MountFn
where
    F: Fn(Arc<PluginModule>, Arc<Context>, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |plugin, ctx, config| Box::pin(f(plugin, ctx, config)))
}

// ─── PluginModule ─────────────────────────────────────────────────────────────

/// A loaded plugin module.
///
/// Modules are produced by a [`PluginDescriptor`](super::PluginDescriptor)
/// factory or built directly with [`PluginModule::builder`]. Everything a
/// module exposes is optional: a module with no `init` hook is mounted by
/// assigning its exports onto the context.
///
/// Cloning is cheap: hooks and exports are reference counted.
#[derive(Clone)]
pub struct PluginModule {
    name: Cow<'static, str>,
    priority: Option<i64>,
    dependencies: Vec<String>,
    init: Option<InitFn>,
    exports: Option<ContextValue>,
}

impl PluginModule {
    /// Starts building a module named `name`.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> PluginModuleBuilder {
        PluginModuleBuilder {
            module: PluginModule {
                name: name.into(),
                priority: None,
                dependencies: Vec::new(),
                init: None,
                exports: None,
            },
        }
    }

    /// Returns the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit priority declared by the module, if any.
    pub fn priority(&self) -> Option<i64> {
        self.priority
    }

    /// Plugin ids this module must be mounted after.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// The module's `init` hook, if it has one.
    pub fn init(&self) -> Option<&InitFn> {
        self.init.as_ref()
    }

    /// The value the module exports, if any.
    pub fn exports(&self) -> Option<&ContextValue> {
        self.exports.as_ref()
    }

    /// Downcasts the exported value to `T`.
    pub fn exports_as<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.exports.clone()?.downcast::<T>().ok()
    }
}

impl std::fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginModule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .field("has_init", &self.init.is_some())
            .field("has_exports", &self.exports.is_some())
            .finish()
    }
}

/// Builder for [`PluginModule`].
pub struct PluginModuleBuilder {
    module: PluginModule,
}

impl PluginModuleBuilder {
    /// Sets an explicit priority (lower mounts first under priority ordering).
    pub fn priority(mut self, priority: i64) -> Self {
        self.module.priority = Some(priority);
        self
    }

    /// Declares the plugin ids this module depends on.
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the async `init(context, config)` hook.
    pub fn on_init<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Context>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.module.init = Some(init_fn(f));
        self
    }

    /// Sets the value assigned onto the context when the module has no hook.
    pub fn exports<T>(mut self, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.module.exports = Some(Arc::new(value));
        self
    }

    /// Finishes the module.
    pub fn build(self) -> PluginModule {
        self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_sets_all_parts() {
        let module = PluginModule::builder("pubsub")
            .priority(-5)
            .depends_on(["logger"])
            .exports("bus".to_string())
            .on_init(|ctx: Arc<Context>, _config| async move {
                ctx.insert("pubsub", true);
                Ok(())
            })
            .build();

        assert_eq!(module.name(), "pubsub");
        assert_eq!(module.priority(), Some(-5));
        assert_eq!(module.dependencies(), ["logger".to_string()]);
        assert_eq!(module.exports_as::<String>().as_deref(), Some(&"bus".to_string()));

        let ctx = Arc::new(Context::new());
        let init = module.init().unwrap();
        init(Arc::clone(&ctx), Value::Null).await.unwrap();
        assert!(ctx.contains("pubsub"));
    }

    #[test]
    fn test_bare_module_has_no_capabilities() {
        let module = PluginModule::builder("noop").build();
        assert!(module.priority().is_none());
        assert!(module.dependencies().is_empty());
        assert!(module.init().is_none());
        assert!(module.exports().is_none());
    }
}
