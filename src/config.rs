//! Configuration for docname.
//!
//! Settings are layered, later sources winning:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! The result is built once at startup and passed around by reference; it
//! is never mutated afterwards.
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCNAME_` and use double
//! underscores to separate nested levels:
//! - `DOCNAME_REPOSITORY=/srv/papers` sets `repository`
//! - `DOCNAME_WATCHER__POLL_INTERVAL_MS=500` sets `watcher.poll_interval_ms`
//! - `DOCNAME_INDEX__SELF_HEAL=false` sets `index.self_heal`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::is_hidden_name;

pub const ENV_PREFIX: &str = "DOCNAME_";
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Configuration file already exists at {}. Use --force to overwrite", .0.display())]
    AlreadyExists(PathBuf),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Repository opened when no path is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<PathBuf>,

    /// Metadata directory inside every repository
    #[serde(default = "default_conf_dir")]
    pub conf_dir: String,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Start polling as soon as a repository is opened
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Milliseconds between two polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VocabularyConfig {
    /// Seed missing `available` catalogs from the built-in lists
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IndexConfig {
    /// Rename malformed filenames to their normalized form during rescans
    #[serde(default = "default_true")]
    pub self_heal: bool,
}

/// Logging configuration.
///
/// ```toml
/// [logging]
/// default = "warn"
///
/// [logging.modules]
/// index = "debug"
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for everything not listed in `modules`
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `docname::watcher = "trace"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_conf_dir() -> String {
    ".conf".to_string()
}
fn default_true() -> bool {
    true
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository: None,
            conf_dir: default_conf_dir(),
            watcher: WatcherConfig::default(),
            vocabulary: VocabularyConfig::default(),
            index: IndexConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self { seed_defaults: true }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { self_heal: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Settings {
    /// Default location of the settings file: `<config dir>/docname/settings.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docname").join(CONFIG_FILE))
    }

    /// Provider stack: defaults, then the TOML file (if present), then `DOCNAME_*`.
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(
            Env::prefixed(ENV_PREFIX)
                // Double underscore separates nested levels
                .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
        )
    }

    /// Load configuration from all sources.
    ///
    /// `config_path` overrides the platform default location.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Self::default_config_path();
        let path = config_path.or(default_path.as_deref());
        Self::from_figment(&Self::figment(path))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let settings: Settings = figment.extract().map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watcher.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "watcher.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        let conf_dir = Path::new(&self.conf_dir);
        if self.conf_dir.is_empty() || conf_dir.components().count() != 1 || conf_dir.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "conf_dir must be a single directory name, got '{}'",
                self.conf_dir
            )));
        }
        // Listings skip hidden entries only, so metadata writes stay invisible to the watcher
        if !is_hidden_name(&self.conf_dir) || matches!(self.conf_dir.as_str(), "." | "..") {
            return Err(ConfigError::Invalid(format!(
                "conf_dir must be a hidden directory name starting with '.', got '{}'",
                self.conf_dir
            )));
        }
        Ok(())
    }

    /// Metadata directory of a repository rooted at `root`.
    pub fn conf_dir_for(&self, root: &Path) -> PathBuf {
        root.join(&self.conf_dir)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file, at `path` or the platform default.
    pub fn init_config_file(path: Option<&Path>, force: bool) -> Result<PathBuf, ConfigError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path().ok_or(ConfigError::NoConfigDir)?,
        };

        if !force && config_path.exists() {
            return Err(ConfigError::AlreadyExists(config_path));
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
