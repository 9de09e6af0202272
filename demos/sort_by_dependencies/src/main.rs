//! Sort By Dependencies Example
//!
//! Mounts the plugins under `plugins/` in dependency order:
//!
//! ```text
//! plugins/
//! ├── authentication/index.js   depends on logger, persistence
//! ├── logger.js
//! ├── persistence.js            depends on logger
//! ├── pubsub.js                 depends on logger
//! └── repl.js                   depends on logger
//! ```
//!
//! The files only mark where the plugins live; their code is compiled into
//! this binary and registered through `PLUGIN_REGISTRY`. The `debug` plugin
//! has no file and is resolved as a package from the `[plugins]` section of
//! `plugmount.toml`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package sort-by-dependencies
//! cargo run --package sort-by-dependencies -- --sort priority
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use plugmount::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

// ============================================================================
// Plugins
// ============================================================================

/// Shared by every plugin to record when it was mounted.
#[derive(Debug, Default)]
struct MountLog(Mutex<Vec<String>>);

impl MountLog {
    fn record(&self, name: &str) {
        if let Ok(mut names) = self.0.lock() {
            names.push(name.to_string());
        }
    }

    fn names(&self) -> Vec<String> {
        self.0.lock().map(|names| names.clone()).unwrap_or_default()
    }
}

/// Warns when `plugin` is mounted ahead of `dependency`, as happens with
/// `--sort priority`.
fn check_dependency(ctx: &Context, plugin: &str, dependency: &str) {
    if !ctx.contains(dependency) {
        warn!(plugin, dependency, "Plugin mounted before its dependency");
    }
}

fn record(ctx: &Context, name: &str) {
    if let Some(log) = ctx.get::<MountLog>("mount.log") {
        log.record(name);
    }
}

async fn logger_init(ctx: Arc<Context>, _config: Value) -> Result<(), BoxError> {
    record(&ctx, "logger");
    ctx.insert("logger", "stdout".to_string());
    Ok(())
}

async fn persistence_init(ctx: Arc<Context>, _config: Value) -> Result<(), BoxError> {
    check_dependency(&ctx, "persistence", "logger");
    record(&ctx, "persistence");
    ctx.insert("persistence", Mutex::new(HashMap::<String, String>::new()));
    Ok(())
}

async fn authentication_init(ctx: Arc<Context>, _config: Value) -> Result<(), BoxError> {
    check_dependency(&ctx, "authentication", "logger");
    check_dependency(&ctx, "authentication", "persistence");
    record(&ctx, "authentication");
    ctx.insert("authentication", true);
    Ok(())
}

async fn pubsub_init(ctx: Arc<Context>, _config: Value) -> Result<(), BoxError> {
    check_dependency(&ctx, "pubsub", "logger");
    record(&ctx, "pubsub");
    ctx.insert("pubsub", ());
    Ok(())
}

async fn repl_init(ctx: Arc<Context>, _config: Value) -> Result<(), BoxError> {
    check_dependency(&ctx, "repl", "logger");
    record(&ctx, "repl");

    let mut events = ctx.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event == PLUGINS_READY {
                info!("repl: all plugins ready, accepting commands");
                break;
            }
        }
    });
    ctx.insert("repl", ());
    Ok(())
}

async fn debug_init(ctx: Arc<Context>, config: Value) -> Result<(), BoxError> {
    record(&ctx, "debug");
    let verbose = config.get("verbose").and_then(Value::as_bool).unwrap_or(false);
    ctx.insert("debug", verbose);
    Ok(())
}

#[distributed_slice(PLUGIN_REGISTRY)]
#[linkme(crate = plugmount::linkme)]
static LOGGER: PluginDescriptor = define_plugin! {
    name: "logger",
    init: logger_init,
};

#[distributed_slice(PLUGIN_REGISTRY)]
#[linkme(crate = plugmount::linkme)]
static PERSISTENCE: PluginDescriptor = define_plugin! {
    name: "persistence",
    dependencies: ["logger"],
    init: persistence_init,
};

#[distributed_slice(PLUGIN_REGISTRY)]
#[linkme(crate = plugmount::linkme)]
static AUTHENTICATION: PluginDescriptor = define_plugin! {
    name: "authentication",
    dependencies: ["logger", "persistence"],
    init: authentication_init,
};

#[distributed_slice(PLUGIN_REGISTRY)]
#[linkme(crate = plugmount::linkme)]
static PUBSUB: PluginDescriptor = define_plugin! {
    name: "pubsub",
    priority: 5,
    dependencies: ["logger"],
    init: pubsub_init,
};

#[distributed_slice(PLUGIN_REGISTRY)]
#[linkme(crate = plugmount::linkme)]
static REPL: PluginDescriptor = define_plugin! {
    name: "repl",
    dependencies: ["logger"],
    init: repl_init,
};

#[distributed_slice(PLUGIN_REGISTRY)]
#[linkme(crate = plugmount::linkme)]
static DEBUG: PluginDescriptor = define_plugin! {
    name: "debug",
    init: debug_init,
};

// ============================================================================
// Main Entry Point
// ============================================================================

#[derive(Debug, Parser)]
#[command(about = "Mount the demo plugins in dependency order")]
struct Args {
    /// Configuration file.
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/plugmount.toml"))]
    config: PathBuf,

    /// Sort strategy override: `priority` or `dependencies`.
    #[arg(long)]
    sort: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = PluginRuntime::builder()
        .config_file(&args.config)
        .set("loader.basepath", env!("CARGO_MANIFEST_DIR"))
        .after_mount(|ctx, _config| {
            ctx.emit(PLUGINS_READY);
        });
    if let Some(sort) = &args.sort {
        builder = builder.set("loader.sort", sort);
    }

    let runtime = builder.build()?;
    let context = runtime.context();
    context.insert("mount.log", MountLog::default());

    runtime.run().await?;

    if let Some(log) = context.get::<MountLog>("mount.log") {
        info!(
            strategy = runtime.loader().sort_strategy(),
            order = ?log.names(),
            "Mount order"
        );
    }

    // Let the repl observe the ready notification before exiting.
    tokio::task::yield_now().await;
    Ok(())
}
