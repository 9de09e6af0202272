//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use plugmount_core::order::SortKind;
use plugmount_loader::{DEFAULT_PATTERNS, LoaderOptions, LoaderResult, PluginRefs};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlugmountConfig {
    /// Loader settings.
    #[serde(default)]
    pub loader: LoaderSection,

    /// Plugins loaded in addition to the configured directories, in any
    /// shape [`PluginRefs::from_value`] accepts.
    ///
    /// A TOML `[plugins]` table reaches this field with its keys sorted.
    /// Use the array form, `plugins = [{ repl = {} }, { logger = {} }]`,
    /// when the declaration order matters.
    #[serde(default)]
    pub plugins: Value,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PlugmountConfig {
    /// Parses the `[plugins]` section.
    pub fn plugin_refs(&self) -> LoaderResult<PluginRefs> {
        PluginRefs::from_value(self.plugins.clone())
    }
}

// =============================================================================
// Loader
// =============================================================================

/// The `[loader]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSection {
    /// Base directory for relative paths; the process working directory
    /// when unset.
    #[serde(default)]
    pub basepath: Option<PathBuf>,

    /// Plugin file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Entry point file name of directory plugins.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// Include/exclude glob patterns for directory scans.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,

    /// Extra exclusions for directory scans.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Sort strategy.
    #[serde(default)]
    pub sort: SortKind,

    /// Whether unknown dependencies become implicit placeholders.
    #[serde(default = "default_allow_implicits")]
    pub allow_implicits: bool,

    /// Directories mounted by `PluginRuntime::run`.
    #[serde(default)]
    pub directories: Vec<PathBuf>,
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            basepath: None,
            extension: default_extension(),
            entry_point: default_entry_point(),
            patterns: default_patterns(),
            exclude: Vec::new(),
            sort: SortKind::default(),
            allow_implicits: default_allow_implicits(),
            directories: Vec::new(),
        }
    }
}

impl LoaderSection {
    /// Converts to loader options.
    pub fn to_options(&self) -> LoaderOptions {
        let defaults = LoaderOptions::default();
        LoaderOptions {
            basepath: self.basepath.clone().unwrap_or(defaults.basepath),
            extension: self.extension.clone(),
            entry_point: self.entry_point.clone(),
            patterns: self.patterns.clone(),
            exclude: self.exclude.clone(),
        }
    }
}

fn default_extension() -> String {
    "js".to_string()
}

fn default_entry_point() -> String {
    "index".to_string()
}

fn default_patterns() -> Vec<String> {
    DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect()
}

fn default_allow_implicits() -> bool {
    true
}

// =============================================================================
// Logging
// =============================================================================

/// The `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-target levels, e.g. `plugmount_loader = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// The parsed global level; unknown values fall back to `info`.
    pub fn level(&self) -> LogLevel {
        self.level.parse().unwrap_or_default()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Needs the `json-log` feature; otherwise logged as `full`.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults_match_loader_defaults() {
        let section = LoaderSection::default();
        let options = section.to_options();

        assert_eq!(options.extension, "js");
        assert_eq!(options.entry_point, "index");
        assert_eq!(options.patterns, ["**", "!node_modules", "!.git"]);
        assert_eq!(section.sort, SortKind::Priority);
        assert!(section.allow_implicits);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: PlugmountConfig = serde_json::from_value(json!({
            "loader": {"sort": "dependencies", "directories": ["plugins"]},
            "plugins": {"debug": {"verbose": true}},
        }))
        .unwrap();

        assert_eq!(config.loader.sort, SortKind::Dependencies);
        assert_eq!(config.loader.directories, [PathBuf::from("plugins")]);
        assert_eq!(config.loader.extension, "js");
        assert_eq!(config.plugin_refs().unwrap().len(), 1);
        assert_eq!(config.logging.level(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("trace".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
    }
}
