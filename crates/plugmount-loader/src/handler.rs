use std::sync::Arc;

use async_trait::async_trait;
use plugmount_core::plugin::{Bean, Capability};
use plugmount_core::{BoxError, Context, ContextValue, MountError};
use serde_json::{Map, Value};

/// Mounts one bean into a context.
///
/// `config` is the call-site configuration; implementations merge it over
/// the bean's own options.
#[async_trait]
pub trait MountHandler: Send + Sync {
    async fn mount(
        &self,
        bean: &Bean,
        context: Arc<Context>,
        config: &Map<String, Value>,
    ) -> Result<(), BoxError>;
}

/// Dispatches on the capability selected when the bean was loaded.
///
/// - `Callable` and `MountCapable` run `f(plugin, context, config)`.
/// - `InitCapable` runs the module's `init(context, config)`.
/// - `Assign` stores the module's exports, or the module itself, on the
///   context under the bean id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMountHandler;

#[async_trait]
impl MountHandler for DefaultMountHandler {
    async fn mount(
        &self,
        bean: &Bean,
        context: Arc<Context>,
        config: &Map<String, Value>,
    ) -> Result<(), BoxError> {
        let plugin = bean
            .plugin()
            .cloned()
            .ok_or_else(|| MountError::NotLoaded {
                id: bean.id.clone(),
            })?;
        let merged = Value::Object(bean.config().merged_with(config));

        match bean.capability() {
            Capability::Callable(f) | Capability::MountCapable(f) => {
                f(plugin, context, merged).await
            }
            Capability::InitCapable(init) => init(context, merged).await,
            Capability::Assign => {
                let value: ContextValue = match plugin.exports() {
                    Some(exports) => Arc::clone(exports),
                    None => plugin as ContextValue,
                };
                context.insert_arc(bean.id.clone(), value);
                Ok(())
            }
        }
    }
}

/// Runs once after every bean in a batch mounted successfully.
pub type AfterMountFn = Arc<dyn Fn(&Context, &Map<String, Value>) + Send + Sync>;

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use plugmount_core::plugin::{BeanConfig, PluginModule};
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn test_init_receives_merged_config() {
        let seen = Arc::new(Mutex::new(Value::Null));
        let sink = Arc::clone(&seen);
        let module = PluginModule::builder("logger")
            .on_init(move |_ctx, config| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock() = config;
                    Ok(())
                }
            })
            .build();

        let mut bean = Bean::new(
            "logger",
            "/app/logger.js",
            BeanConfig::from(json!({"level": "info", "color": true})),
        );
        bean.attach(module, true);

        let ctx = Arc::new(Context::new());
        DefaultMountHandler
            .mount(&bean, ctx, &object(json!({"level": "debug"})))
            .await
            .unwrap();

        assert_eq!(*seen.lock(), json!({"level": "debug", "color": true}));
    }

    #[tokio::test]
    async fn test_callable_config_replaces_init() {
        let calls = Arc::new(Mutex::new(Vec::new()));

        let init_calls = Arc::clone(&calls);
        let module = PluginModule::builder("debug")
            .on_init(move |_ctx, _config| {
                let calls = Arc::clone(&init_calls);
                async move {
                    calls.lock().push("init");
                    Ok(())
                }
            })
            .build();

        let call_calls = Arc::clone(&calls);
        let mut bean = Bean::new(
            "debug",
            "debug",
            BeanConfig::callable(move |plugin, _ctx, _config| {
                let calls = Arc::clone(&call_calls);
                async move {
                    assert_eq!(plugin.name(), "debug");
                    calls.lock().push("callable");
                    Ok(())
                }
            }),
        );
        bean.attach(module, false);

        let ctx = Arc::new(Context::new());
        DefaultMountHandler.mount(&bean, ctx, &Map::new()).await.unwrap();

        assert_eq!(*calls.lock(), ["callable"]);
    }

    #[tokio::test]
    async fn test_mount_option_sees_options() {
        let seen = Arc::new(Mutex::new(Value::Null));
        let sink = Arc::clone(&seen);
        let mut bean = Bean::new(
            "repl",
            "repl",
            BeanConfig::with_mount(object(json!({"prompt": "> "})), move |_p, _ctx, config| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock() = config;
                    Ok(())
                }
            }),
        );
        bean.attach(PluginModule::builder("repl").build(), true);

        DefaultMountHandler
            .mount(&bean, Arc::new(Context::new()), &object(json!({"history": 10})))
            .await
            .unwrap();

        assert_eq!(*seen.lock(), json!({"prompt": "> ", "history": 10}));
    }

    #[tokio::test]
    async fn test_assign_exports_or_module() {
        let ctx = Arc::new(Context::new());

        let mut with_exports = Bean::new("version", "version", BeanConfig::default());
        with_exports.attach(PluginModule::builder("version").exports("1.2.0").build(), true);
        DefaultMountHandler
            .mount(&with_exports, Arc::clone(&ctx), &Map::new())
            .await
            .unwrap();

        let mut bare = Bean::new("marker", "marker", BeanConfig::default());
        bare.attach(PluginModule::builder("marker").build(), true);
        DefaultMountHandler
            .mount(&bare, Arc::clone(&ctx), &Map::new())
            .await
            .unwrap();

        assert_eq!(ctx.get::<&str>("version").as_deref(), Some(&"1.2.0"));
        assert_eq!(ctx.get::<PluginModule>("marker").unwrap().name(), "marker");
    }

    #[tokio::test]
    async fn test_unloaded_bean_is_an_error() {
        let bean = Bean::new("ghost", "ghost", BeanConfig::default());
        let err = DefaultMountHandler
            .mount(&bean, Arc::new(Context::new()), &Map::new())
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<MountError>().is_some());
    }
}
