//! On-disk configuration (`config.toml`).
//!
//! ```toml
//! [storage]
//! data_dir = "/home/me/.local/share/parley"
//! page_size = 25
//!
//! [cache]
//! ttl_secs = 30
//!
//! [key]
//! type = "env"
//! var = "PARLEY_MASTER_KEY"
//! ```
//!
//! Every field is optional. A missing file yields the defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::encryption::KeySource;
use crate::storage::PAGE_SIZE;

const APP_DIR: &str = "parley";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("TOML error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine the {0} directory for this platform")]
    NoPlatformDir(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub key: KeySource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSection {
    /// Root of all collections; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: None,
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    PAGE_SIZE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

/// `<config dir>/parley/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|p| p.join(APP_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::NoPlatformDir("config"))
}

/// `<local data dir>/parley`
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|p| p.join(APP_DIR))
        .ok_or(ConfigError::NoPlatformDir("data"))
}

impl StoreConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    pub fn settings_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("settings"))
    }

    pub fn conversations_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("conversations"))
    }

    pub fn page_size(&self) -> usize {
        self.storage.page_size.max(1)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}
