//! User configuration
//!
//! `config.toml` in the platform config directory is optional. It can pin a
//! model per provider, switch providers off, and change the redraw tick.

pub mod keys;

pub use keys::{ApiKeys, KeysError};

use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_TICK_MS: u64 = 500;
const MIN_TICK_MS: u64 = 16;

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Model override per provider id (e.g. `openai = "gpt-4o"`)
    #[serde(default)]
    pub models: HashMap<String, String>,
    /// Provider ids that are never asked for a candidate
    #[serde(default)]
    pub disabled_providers: Vec<String>,
    /// Redraw interval in milliseconds
    pub tick_ms: Option<u64>,
}

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path_display(path), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path_display(path), source)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        match config_dir() {
            Some(dir) => Self::load_from_path(&dir.join(CONFIG_FILE_NAME)),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    pub fn model_for(&self, provider_id: &str) -> Option<&str> {
        self.models
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(provider_id))
            .map(|(_, model)| model.as_str())
            .filter(|model| !model.trim().is_empty())
    }

    pub fn is_disabled(&self, provider_id: &str) -> bool {
        self.disabled_providers
            .iter()
            .any(|id| id.eq_ignore_ascii_case(provider_id))
    }

    /// Redraw interval, with `override_ms` (from the command line) winning.
    pub fn tick_interval(&self, override_ms: Option<u64>) -> Duration {
        let ms = override_ms.or(self.tick_ms).unwrap_or(DEFAULT_TICK_MS);
        Duration::from_millis(ms.max(MIN_TICK_MS))
    }
}

pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "multichat", "multichat").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Shows paths under the home directory with a `~` prefix.
pub fn path_display(path: &Path) -> String {
    if let Some(home) = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()) {
        if let Ok(rest) = path.strip_prefix(&home) {
            return Path::new("~").join(rest).display().to_string();
        }
    }
    path.display().to_string()
}
