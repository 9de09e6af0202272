/// Defines a [`PluginDescriptor`](crate::plugin::PluginDescriptor).
///
/// Only `name` is required. The remaining fields are optional but must
/// appear in this order:
///
/// ```rust,ignore
/// async fn logger_init(ctx: Arc<Context>, config: serde_json::Value) -> Result<(), BoxError> {
///     ctx.insert("logger", Logger::from_config(&config));
///     Ok(())
/// }
///
/// pub static LOGGER: PluginDescriptor = define_plugin! {
///     name: "logger",
///     priority: -10,
///     dependencies: [],
///     init: logger_init,
/// };
///
/// pub static CLOCK: PluginDescriptor = define_plugin! {
///     name: "clock",
///     exports: SystemClock,
/// };
/// ```
///
/// The descriptor is a `const` value, so it can initialise a `static` and be
/// contributed to [`PLUGIN_REGISTRY`](crate::plugin::PLUGIN_REGISTRY).
#[macro_export]
macro_rules! define_plugin {
    (
        name: $name:literal
        $(, priority: $priority:expr)?
        $(, dependencies: [$($dep:literal),* $(,)?])?
        $(, init: $init:path)?
        $(, exports: $exports:expr)?
        $(,)?
    ) => {{
        fn __plugmount_create() -> $crate::plugin::PluginModule {
            let builder = $crate::plugin::PluginModule::builder($name);
            $(
                let builder = builder.priority($priority);
            )?
            $(
                let dependencies: ::std::vec::Vec<::std::string::String> =
                    ::std::vec![$(::std::string::String::from($dep)),*];
                let builder = builder.depends_on(dependencies);
            )?
            $(
                let builder = builder.on_init($init);
            )?
            $(
                let builder = builder.exports($exports);
            )?
            builder.build()
        }
        $crate::plugin::PluginDescriptor::new($name, __plugmount_create)
    }};
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use crate::context::Context;
    use crate::error::BoxError;
    use crate::plugin::PluginDescriptor;

    async fn auth_init(ctx: Arc<Context>, _config: Value) -> Result<(), BoxError> {
        ctx.insert("auth", "checked".to_string());
        Ok(())
    }

    static AUTH: PluginDescriptor = define_plugin! {
        name: "authentication",
        dependencies: ["logger", "persistence"],
        init: auth_init,
    };

    static BARE: PluginDescriptor = define_plugin! { name: "bare" };

    static RANKED: PluginDescriptor = define_plugin! {
        name: "ranked",
        priority: -100,
        exports: 7_u8,
    };

    #[test]
    fn test_define_plugin_fields() {
        let auth = AUTH.instantiate();
        assert_eq!(AUTH.name, "authentication");
        assert_eq!(auth.dependencies(), ["logger".to_string(), "persistence".to_string()]);
        assert!(auth.init().is_some());
        assert!(auth.priority().is_none());

        let bare = BARE.instantiate();
        assert!(bare.dependencies().is_empty());
        assert!(bare.init().is_none());

        let ranked = RANKED.instantiate();
        assert_eq!(ranked.priority(), Some(-100));
        assert_eq!(ranked.exports_as::<u8>().as_deref(), Some(&7));
    }
}
