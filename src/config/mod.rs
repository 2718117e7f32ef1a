//! Configuration management for portalsync
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sync cycle configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Content source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Folder names initialized for every new tenant
    #[serde(default = "default_folders")]
    pub default_folders: Vec<String>,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Sync cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds to sleep between sync cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum retry attempts; records at or above this stay stuck
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds to wait after a cycle-level failure before the next attempt
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Listing page size requested from the source
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

/// Content source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the content source API
    #[serde(default = "default_source_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    /// User agent string
    #[serde(default = "default_source_user_agent")]
    pub user_agent: String,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for portalsync data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            source: SourceConfig::default(),
            default_folders: default_folders(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_base_url(),
            timeout_secs: default_source_timeout(),
            user_agent: default_source_user_agent(),
        }
    }
}

impl Config {
    /// Get the default base directory for portalsync (~/.portalsync)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".portalsync")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths.config_file = base.join("config.toml");
        self.paths.db_file = base.join("portalsync.db");
        self.paths.base_dir = base;
    }

    /// Load configuration from a specific file
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base_dir = config_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_base_dir);
        config.init_paths(Some(base_dir));
        config.paths.config_file = config_path.to_path_buf();

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_config_path())
    }

    /// Build a default configuration rooted at the given base directory
    pub fn with_base_dir(base_dir: Option<PathBuf>) -> Self {
        let mut config = Config::default();
        config.init_paths(base_dir);
        config
    }

    /// Save configuration to its config file path
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;

        debug!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Check whether the config file exists on disk
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sync.poll_interval_secs == 0 {
            return Err(Error::Config(
                "sync.poll_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.sync.batch_size == 0 {
            return Err(Error::Config(
                "sync.batch_size must be greater than 0".to_string(),
            ));
        }

        if self.source.timeout_secs == 0 {
            return Err(Error::Config(
                "source.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Url::parse(&self.source.base_url).map_err(|e| {
            Error::Config(format!(
                "source.base_url is not a valid URL ({}): {}",
                self.source.base_url, e
            ))
        })?;

        if self.default_folders.is_empty() {
            return Err(Error::Config(
                "default_folders must name at least one folder".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sync.poll_interval_secs, 300);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.sync.batch_size, 50);
        assert!(config.default_folders.contains(&"budgets".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::with_base_dir(Some(tmp.path().to_path_buf()));
        config.sync.poll_interval_secs = 120;
        config.source.base_url = "https://content.example.com".to_string();
        config.save().unwrap();

        let loaded = Config::load(&config.paths.config_file).unwrap();
        assert_eq!(loaded.sync.poll_interval_secs, 120);
        assert_eq!(loaded.source.base_url, "https://content.example.com");
        assert_eq!(loaded.paths.base_dir, tmp.path());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.sync.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.source.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.default_folders.clear();
        assert!(config.validate().is_err());
    }
}
