use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use plugmount_core::BoxError;
use plugmount_core::plugin::{Bean, PluginModule};
use thiserror::Error;
use tracing::debug;

use crate::catalog::Catalog;

/// A module found for a bean.
#[derive(Debug)]
pub struct ResolvedModule {
    pub module: PluginModule,
    /// `true` if the plugin was found at a local path.
    pub is_local: bool,
}

/// Finds the module behind a bean.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn resolve(&self, bean: &Bean) -> Result<ResolvedModule, BoxError>;
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("plugin found at {} but no module is registered as '{id}'", path.display())]
    Unregistered { id: String, path: PathBuf },

    #[error("no plugin at '{path}' and no package registered under that name")]
    NotFound { path: String },
}

/// Resolves beans against a [`Catalog`].
///
/// If the bean path exists on disk, as given or with the plugin extension
/// appended, the plugin is local and its module is looked up by bean id.
/// Otherwise it is treated as a package and looked up by its path.
/// Relative paths are checked against `basepath`.
#[derive(Debug, Clone)]
pub struct CatalogResolver {
    catalog: Catalog,
    basepath: PathBuf,
    extension: String,
}

impl CatalogResolver {
    pub fn new(catalog: Catalog, basepath: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            catalog,
            basepath: basepath.into(),
            extension: extension.into(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn locate(&self, path: &str) -> Option<PathBuf> {
        if path.is_empty() {
            return None;
        }

        let exact = self.basepath.join(path);
        if exists(&exact).await {
            return Some(exact);
        }

        let mut with_ext = OsString::from(exact);
        with_ext.push(".");
        with_ext.push(&self.extension);
        let with_ext = PathBuf::from(with_ext);
        exists(&with_ext).await.then_some(with_ext)
    }
}

#[async_trait]
impl ModuleResolver for CatalogResolver {
    async fn resolve(&self, bean: &Bean) -> Result<ResolvedModule, BoxError> {
        if let Some(location) = self.locate(&bean.path).await {
            debug!(plugin = %bean.id, path = %location.display(), "Found local plugin");
            let module = self
                .catalog
                .instantiate(&bean.id)
                .ok_or_else(|| ResolveError::Unregistered {
                    id: bean.id.clone(),
                    path: location,
                })?;
            return Ok(ResolvedModule {
                module,
                is_local: true,
            });
        }

        debug!(plugin = %bean.id, package = %bean.path, "Resolving plugin as package");
        let module = self
            .catalog
            .instantiate(&bean.path)
            .ok_or_else(|| ResolveError::NotFound {
                path: bean.path.clone(),
            })?;
        Ok(ResolvedModule {
            module,
            is_local: false,
        })
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
