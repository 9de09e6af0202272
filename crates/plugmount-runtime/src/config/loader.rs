//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables `plugmount.toml`
//! - `yaml-config`: enables `plugmount.yaml` / `plugmount.yml`
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic base configuration ([`ConfigLoader::merge`])
//! 3. Profile-specific config file (`plugmount.{profile}.toml`)
//! 4. Main config file (`plugmount.toml`)
//! 5. Environment variables (`PLUGMOUNT_*`)
//! 6. Programmatic overrides ([`ConfigLoader::set`])
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `PLUGMOUNT_` prefix with `__` as separator:
//!
//! - `PLUGMOUNT_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `PLUGMOUNT_LOADER__SORT=dependencies` → `loader.sort = "dependencies"`
//! - `PLUGMOUNT_LOADER__DIRECTORIES=["plugins"]` → `loader.directories = ["plugins"]`
//!
//! # Development Mode
//!
//! With the `development` profile, or when `DEBUG` is set, the built-in
//! log level is `debug` instead of `info`. Any configured level still wins.
//!
//! # Example
//!
//! ```rust,ignore
//! use plugmount_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/plugmount.toml")
//!     .set("loader.sort", "dependencies")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::PlugmountConfig;

const ENV_PREFIX: &str = "PLUGMOUNT_";
const PROFILE_VAR: &str = "PLUGMOUNT_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `dev` and `prod` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            _ => Self::Custom(name.to_string()),
        }
    }

    /// Reads the profile from `PLUGMOUNT_PROFILE`.
    pub fn from_env() -> Option<Self> {
        std::env::var(PROFILE_VAR)
            .ok()
            .filter(|p| !p.is_empty())
            .map(|p| Self::parse(&p))
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic base configuration.
    figment: Figment,
    /// Programmatic keyed overrides.
    overrides: Figment,
    /// Active profile, if any.
    profile: Option<Profile>,
    /// Forces development mode on or off.
    development: Option<bool>,
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            overrides: Figment::new(),
            profile: Profile::from_env(),
            development: None,
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Some(Profile::parse(profile.as_ref()));
        self
    }

    /// Forces development mode instead of deriving it from the profile
    /// and `DEBUG`.
    pub fn development(mut self, enabled: bool) -> Self {
        self.development = Some(enabled);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a whole configuration just above the built-in defaults.
    ///
    /// Files and environment variables still override it.
    pub fn merge(mut self, config: PlugmountConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Overrides a single (dotted) key above every other source.
    ///
    /// ```rust,ignore
    /// ConfigLoader::new().set("logging.level", "trace")
    /// ```
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Returns `true` when development defaults apply.
    pub fn is_development(&self) -> bool {
        self.development.unwrap_or_else(|| {
            matches!(self.profile, Some(Profile::Development))
                || std::env::var_os("DEBUG").is_some_and(|v| !v.is_empty())
        })
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<PlugmountConfig> {
        let profile = self
            .profile
            .as_ref()
            .map_or("default", Profile::as_str)
            .to_string();
        let figment = self.build_figment()?;

        let config: PlugmountConfig = figment.extract()?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            sort = %config.loader.sort,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut defaults = PlugmountConfig::default();
        if self.is_development() {
            defaults.logging.level = "debug".to_string();
        }
        let mut figment = Figment::from(Serialized::defaults(defaults));

        let base = std::mem::take(&mut self.figment);
        figment = figment.merge(base);

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let overrides = std::mem::take(&mut self.overrides);
        Ok(figment.merge(overrides))
    }

    /// Merges a single config file, dispatching on file extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => {
                drop(figment);
                Err(ConfigError::UnsupportedFormat(ext.to_string()))
            }
        }
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("plugmount"));
        }
        paths
    }

    /// Iterates `search_paths × base_names`, merging a profile-specific
    /// variant first and then the base file. Stops at the first base file.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                if let Some(profile) = &self.profile {
                    let profile_path =
                        search_path.join(format!("{stem}.{}.{ext}", profile.as_str()));
                    if profile_path.exists() {
                        debug!(path = %profile_path.display(), "Loading profile-specific config");
                        figment = merge_fn(figment, &profile_path);
                    }
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    figment = merge_fn(figment, &base_path);
                    return (figment, true);
                }
            }
        }
        (figment, false)
    }

    /// Searches for and loads configuration files from search paths.
    #[allow(unused_mut, unused_variables)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["plugmount.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["plugmount.yaml", "plugmount.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<PlugmountConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from a specific file, with environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<PlugmountConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
