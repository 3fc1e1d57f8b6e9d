//! Process configuration
//!
//! Resolution order, later steps winning:
//!
//! 1. hardcoded defaults
//! 2. TOML file named by `SKZ_CONFIG` (missing file → defaults, with a warning)
//! 3. environment overrides
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | SKZ_CONFIG | - | Path to a TOML config file |
//! | SKZ_INFO_DIR | ~/.skizze | Info record directory |
//! | SKZ_DATA_DIR | ~/.skizze/data | Sketch snapshot directory |
//! | SKZ_PORT | 3956 | Service port |
//! | SKZ_SAVE_THRESHOLD_SECS | 1 (floored to 3) | Minimum seconds between saves |
//! | SKZ_SAVE_TRESHOLD_SECS | - | Older spelling of the above, read only when it is unset |
//!
//! Nothing here is a process-wide singleton: callers resolve a `Config` once
//! and pass it (or values derived from it) to the components that need it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const ENV_CONFIG: &str = "SKZ_CONFIG";
pub const ENV_INFO_DIR: &str = "SKZ_INFO_DIR";
pub const ENV_DATA_DIR: &str = "SKZ_DATA_DIR";
pub const ENV_PORT: &str = "SKZ_PORT";
pub const ENV_SAVE_THRESHOLD_SECS: &str = "SKZ_SAVE_THRESHOLD_SECS";
/// Misspelled name existing deployments set
pub const ENV_SAVE_THRESHOLD_SECS_LEGACY: &str = "SKZ_SAVE_TRESHOLD_SECS";

pub const DEFAULT_INFO_DIR: &str = "~/.skizze";
pub const DEFAULT_DATA_DIR: &str = "~/.skizze/data";
pub const DEFAULT_PORT: u16 = 3956;
pub const DEFAULT_SAVE_THRESHOLD_SECONDS: u64 = 1;

/// Default relative error for frequency sketches
pub const DEFAULT_EPSILON: f64 = 0.00000543657;
/// Default delta for frequency sketches
pub const DEFAULT_DELTA: f64 = 0.99;

/// Saves are never scheduled more often than this
pub const SAVE_THRESHOLD_SECONDS_MIN: u64 = 3;

/// Error type for configuration resolution
#[derive(Debug)]
pub enum ConfigError {
    /// Config file exists but could not be read, or a directory could not be created
    Io { path: PathBuf, source: std::io::Error },
    /// Config file is not valid TOML for `Config`
    Parse { path: PathBuf, source: toml::de::Error },
    /// A `~/` path needs expanding but HOME is unset
    NoHomeDir,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "I/O error on {:?}: {}", path, source),
            ConfigError::Parse { path, source } => {
                write!(f, "Invalid config file {:?}: {}", path, source)
            }
            ConfigError::NoHomeDir => write!(f, "Cannot expand '~': HOME is not set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::NoHomeDir => None,
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding info records
    pub info_dir: PathBuf,
    /// Directory holding sketch snapshots
    pub data_dir: PathBuf,
    /// Service port
    pub port: u16,
    /// Minimum seconds between saves (floored to SAVE_THRESHOLD_SECONDS_MIN)
    pub save_threshold_seconds: u64,
    /// Relative error for new frequency sketches
    pub epsilon: f64,
    /// Delta for new frequency sketches
    pub delta: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            info_dir: PathBuf::from(DEFAULT_INFO_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            port: DEFAULT_PORT,
            save_threshold_seconds: DEFAULT_SAVE_THRESHOLD_SECONDS,
            epsilon: DEFAULT_EPSILON,
            delta: DEFAULT_DELTA,
        }
    }
}

impl Config {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup
    pub fn resolve<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = match var(ENV_CONFIG) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => {
                debug!("{} not set, using built-in defaults", ENV_CONFIG);
                Config::default()
            }
        };

        if let Some(dir) = var(ENV_INFO_DIR) {
            config.info_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = var(ENV_PORT) {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!("Ignoring unparseable {}={:?}", ENV_PORT, port),
            }
        }
        let threshold = var(ENV_SAVE_THRESHOLD_SECS)
            .map(|secs| (ENV_SAVE_THRESHOLD_SECS, secs))
            .or_else(|| {
                var(ENV_SAVE_THRESHOLD_SECS_LEGACY)
                    .map(|secs| (ENV_SAVE_THRESHOLD_SECS_LEGACY, secs))
            });
        if let Some((name, secs)) = threshold {
            match secs.parse() {
                Ok(secs) => config.save_threshold_seconds = secs,
                Err(_) => warn!("Ignoring unparseable {}={:?}", name, secs),
            }
        }

        let home = var("HOME");
        config.info_dir = expand_home(&config.info_dir, home.as_deref())?;
        config.data_dir = expand_home(&config.data_dir, home.as_deref())?;
        config.save_threshold_seconds = config.save_threshold_seconds.max(SAVE_THRESHOLD_SECONDS_MIN);

        Ok(config)
    }

    /// Load a TOML file on top of the defaults. A missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Unable to find config file {:?}, using defaults", path);
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Create the info and data directories if they don't exist
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [&self.info_dir, &self.data_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn save_threshold(&self) -> Duration {
        Duration::from_secs(self.save_threshold_seconds)
    }
}

fn expand_home(path: &Path, home: Option<&str>) -> Result<PathBuf, ConfigError> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = home.ok_or(ConfigError::NoHomeDir)?;
    Ok(Path::new(home).join(rest))
}
