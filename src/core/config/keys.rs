//! API credentials from `keys.conf`.
//!
//! The file holds up to three `NAME="value"` lines, one per provider. Keys the
//! file leaves out may come from environment variables of the same name.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{config_dir, path_display};

pub const KEYS_FILE_NAME: &str = "keys.conf";
pub const KEY_NAMES: [&str; 3] = ["ANTHROPIC_API_KEY", "OPENAI_API_KEY", "MISTRAL_API_KEY"];

#[derive(Debug)]
pub enum KeysError {
    /// An explicitly requested key file could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// None of the known credentials is set.
    NoCredentials { searched: Vec<PathBuf> },
}

impl fmt::Display for KeysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeysError::Read { path, source } => {
                write!(f, "Failed to read keys at {}: {}", path_display(path), source)
            }
            KeysError::NoCredentials { searched } => {
                write!(f, "No API keys found. Please add your keys to {KEYS_FILE_NAME}")?;
                if !searched.is_empty() {
                    let places: Vec<String> = searched.iter().map(|p| path_display(p)).collect();
                    write!(f, " (looked in: {})", places.join(", "))?;
                }
                write!(f, ". Expected one or more of: {}.", KEY_NAMES.join(", "))
            }
        }
    }
}

impl StdError for KeysError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            KeysError::Read { source, .. } => Some(source),
            KeysError::NoCredentials { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    keys: HashMap<String, String>,
}

impl ApiKeys {
    pub fn parse(contents: &str) -> Self {
        let mut keys = HashMap::new();
        for line in contents.lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if !KEY_NAMES.contains(&name) {
                continue;
            }
            let value = unquote(value.trim());
            if !value.is_empty() {
                keys.insert(name.to_string(), value.to_string());
            }
        }
        Self { keys }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, KeysError> {
        let contents = fs::read_to_string(path).map_err(|source| KeysError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&contents))
    }

    /// Loads keys from `explicit`, or from the first `keys.conf` found in the
    /// working directory or the config directory, then fills gaps from the
    /// environment. Fails when no key is available at all.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, KeysError> {
        let mut searched = Vec::new();
        let mut keys = match explicit {
            Some(path) => {
                searched.push(path.to_path_buf());
                Self::load_from_path(path)?
            }
            None => {
                let mut candidates = vec![PathBuf::from(KEYS_FILE_NAME)];
                if let Some(dir) = config_dir() {
                    candidates.push(dir.join(KEYS_FILE_NAME));
                }
                searched.extend(candidates.iter().cloned());
                match candidates.into_iter().find(|path| path.is_file()) {
                    Some(path) => {
                        debug!(path = %path_display(&path), "loading keys");
                        Self::load_from_path(&path)?
                    }
                    None => Self::default(),
                }
            }
        };

        keys.fill_from(|name| std::env::var(name).ok());
        keys.require_any(searched)
    }

    /// Sets any missing known key from `lookup`.
    pub fn fill_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for name in KEY_NAMES {
            if self.keys.contains_key(name) {
                continue;
            }
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                self.keys.insert(name.to_string(), value.trim().to_string());
            }
        }
    }

    pub fn require_any(self, searched: Vec<PathBuf>) -> Result<Self, KeysError> {
        if self.is_empty() {
            Err(KeysError::NoCredentials { searched })
        } else {
            Ok(self)
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.keys.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
