//! Plugin reference normalization.
//!
//! Users hand the loader plugins in several shapes:
//!
//! ```text
//! "logger"                                  single identifier
//! ["./plugins/logger.js", "pubsub"]         list of identifiers
//! [{"./plugins/repl": {"prompt": "> "}}]    list of single-key mappings
//! {"logger": {}, "repl": {"prompt": "> "}}  one mapping
//! ```
//!
//! [`normalize`] turns every shape into a flat list of [`Bean`]s.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use plugmount_core::plugin::{Bean, BeanConfig, PluginModule};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{LoaderError, LoaderResult};

// ─── PluginRef ────────────────────────────────────────────────────────────────

/// One plugin reference before normalization.
#[derive(Debug, Clone)]
pub enum PluginRef {
    /// A path or package name with default configuration.
    Path(String),
    /// A path or package name with its own configuration.
    Configured { path: String, config: BeanConfig },
    /// A module defined in code; it is never resolved.
    Inline {
        id: String,
        module: PluginModule,
        config: BeanConfig,
    },
}

impl PluginRef {
    pub fn configured(path: impl Into<String>, config: impl Into<BeanConfig>) -> Self {
        Self::Configured {
            path: path.into(),
            config: config.into(),
        }
    }

    pub fn inline(id: impl Into<String>, module: PluginModule) -> Self {
        Self::Inline {
            id: id.into(),
            module,
            config: BeanConfig::default(),
        }
    }

    /// Builder-style config setter for inline references.
    pub fn with_config(self, config: impl Into<BeanConfig>) -> Self {
        match self {
            Self::Path(path) | Self::Configured { path, .. } => Self::configured(path, config),
            Self::Inline { id, module, .. } => Self::Inline {
                id,
                module,
                config: config.into(),
            },
        }
    }
}

impl From<&str> for PluginRef {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for PluginRef {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<PathBuf> for PluginRef {
    fn from(path: PathBuf) -> Self {
        Self::Path(path.to_string_lossy().into_owned())
    }
}

impl<S, C> From<(S, C)> for PluginRef
where
    S: Into<String>,
    C: Into<BeanConfig>,
{
    fn from((path, config): (S, C)) -> Self {
        Self::configured(path, config)
    }
}

// ─── PluginRefs ───────────────────────────────────────────────────────────────

/// An ordered batch of plugin references.
#[derive(Debug, Clone, Default)]
pub struct PluginRefs(Vec<PluginRef>);

impl PluginRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the mapping shape from `(path, config)` pairs.
    pub fn from_pairs<I, S, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: Into<BeanConfig>,
    {
        Self(pairs.into_iter().map(PluginRef::from).collect())
    }

    /// Parses any supported shape from JSON-like data, as found in
    /// configuration files.
    ///
    /// `null` is an empty batch. A mapping inside a list may carry several
    /// keys; each becomes its own reference. Mapping keys keep the order
    /// they were declared in.
    pub fn from_value(value: Value) -> LoaderResult<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::String(path) => Ok(Self(vec![PluginRef::Path(path)])),
            Value::Object(map) => Ok(Self::from(map)),
            Value::Array(items) => {
                let mut refs = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(path) => refs.push(PluginRef::Path(path)),
                        Value::Object(map) => {
                            refs.extend(map.into_iter().map(PluginRef::from));
                        }
                        other => {
                            return Err(LoaderError::invalid_reference(format!(
                                "expected a string or a mapping in plugin list, got {other}"
                            )));
                        }
                    }
                }
                Ok(Self(refs))
            }
            other => Err(LoaderError::invalid_reference(format!(
                "expected a string, list or mapping of plugins, got {other}"
            ))),
        }
    }

    pub fn push(&mut self, plugin: impl Into<PluginRef>) {
        self.0.push(plugin.into());
    }

    /// Appends every reference of `other`.
    pub fn extend(&mut self, other: PluginRefs) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginRef> {
        self.0.iter()
    }
}

impl IntoIterator for PluginRefs {
    type Item = PluginRef;
    type IntoIter = std::vec::IntoIter<PluginRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: Into<PluginRef>> FromIterator<T> for PluginRefs {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<PluginRef> for PluginRefs {
    fn from(plugin: PluginRef) -> Self {
        Self(vec![plugin])
    }
}

impl From<&str> for PluginRefs {
    fn from(path: &str) -> Self {
        Self(vec![PluginRef::from(path)])
    }
}

impl From<String> for PluginRefs {
    fn from(path: String) -> Self {
        Self(vec![PluginRef::from(path)])
    }
}

impl<T: Into<PluginRef>> From<Vec<T>> for PluginRefs {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Into<PluginRef>, const N: usize> From<[T; N]> for PluginRefs {
    fn from(items: [T; N]) -> Self {
        items.into_iter().collect()
    }
}

impl From<Map<String, Value>> for PluginRefs {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_pairs(map)
    }
}

// ─── normalize ────────────────────────────────────────────────────────────────

/// Flattens `refs` into beans.
///
/// - The id is the final path segment without its extension.
/// - A path containing a separator is made absolute against `basepath`;
///   a bare identifier is kept as-is and later resolved as a package.
/// - When two references share an id the later one wins, keeping the
///   position of the first.
pub fn normalize(refs: PluginRefs, basepath: &Path) -> Vec<Bean> {
    let mut beans: Vec<Bean> = Vec::with_capacity(refs.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for plugin in refs {
        let bean = match plugin {
            PluginRef::Path(path) => {
                Bean::new(id_from_path(&path), resolve_path(&path, basepath), BeanConfig::default())
            }
            PluginRef::Configured { path, config } => {
                Bean::new(id_from_path(&path), resolve_path(&path, basepath), config)
            }
            PluginRef::Inline { id, module, config } => {
                let mut bean = Bean::new(id, "", config);
                bean.attach(module, true);
                bean
            }
        };

        match positions.get(&bean.id) {
            Some(&index) => {
                debug!(plugin = %bean.id, path = %bean.path, "Plugin listed twice, later entry wins");
                beans[index] = bean;
            }
            None => {
                positions.insert(bean.id.clone(), beans.len());
                beans.push(bean);
            }
        }
    }

    beans
}

/// Derives a bean id from a path or package name.
///
/// `"/app/plugins/logger.js"` gives `"logger"`, `"./plugins/authentication"`
/// gives `"authentication"` and `"@scope/tool"` gives `"tool"`.
pub fn id_from_path(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Returns `true` if `path` names a location rather than a bare package.
pub fn is_path_like(path: &str) -> bool {
    path.contains('/') || path.contains(std::path::MAIN_SEPARATOR)
}

fn resolve_path(path: &str, basepath: &Path) -> String {
    if !is_path_like(path) {
        return path.to_string();
    }
    absolutize(Path::new(path), basepath)
        .to_string_lossy()
        .into_owned()
}

/// Joins `path` onto `basepath` and cleans `.` and `..` lexically.
pub(crate) fn absolutize(path: &Path, basepath: &Path) -> PathBuf {
    let joined = basepath.join(path);
    let joined = std::path::absolute(&joined).unwrap_or(joined);

    let mut clean = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other),
        }
    }
    clean
}
