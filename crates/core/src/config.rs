//! Runtime configuration
//!
//! Loaded from `counselbook.toml`. Every field has a default, so an empty
//! file (or no file) is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scheduling::DEFAULT_SESSION_MINUTES;
use crate::storage::DEFAULT_BUSY_TIMEOUT;

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "counselbook.toml";

/// Default RPC port
pub const DEFAULT_PORT: u16 = 7441;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Database location and lock waiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Length of one bookable session
    #[serde(default = "default_session_minutes")]
    pub session_minutes: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            session_minutes: default_session_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT.as_millis() as u64
}

fn default_session_minutes() -> u32 {
    DEFAULT_SESSION_MINUTES
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Config {
    /// Parse and validate TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from `path` if given, else from the default location if that
    /// file exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        let default = Self::default_config_path()?;
        if default.exists() {
            Self::load_from_file(&default)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let minutes = self.scheduling.session_minutes;
        if minutes == 0 || minutes > 24 * 60 {
            return Err(Error::Validation(format!(
                "scheduling.session_minutes must be 1-1440, got {}",
                minutes
            )));
        }
        if self.storage.busy_timeout_ms == 0 {
            return Err(Error::Validation(
                "storage.busy_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }

    /// Configured database path, or the platform default
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("counselbook.db")),
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "counselbook", "counselbook").ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine data directory",
        ))
    })
}
