//! Configuration management for rr-cache

pub mod schema;

pub use schema::Config;

use crate::acquire::write_atomic;
use crate::error::{CacheError, CacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rr-cache")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub async fn load(&self) -> CacheResult<Config> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "No config at {}, using defaults",
                    self.config_path.display()
                );
                return Ok(Config::default());
            }
            Err(e) => {
                let context = format!("reading config from {}", self.config_path.display());
                return Err(CacheError::io(context, e));
            }
        };

        self.parse(&content)
    }

    /// Parse and validate configuration text as if read from this manager's path
    pub fn parse(&self, content: &str) -> CacheResult<Config> {
        let invalid = |reason: String| CacheError::ConfigInvalid {
            path: self.config_path.clone(),
            reason,
        };

        let config: Config = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(invalid)?;
        Ok(config)
    }

    /// Write configuration, replacing any existing file atomically
    pub async fn save(&self, config: &Config) -> CacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let body = toml::to_string_pretty(config)?;
        let content = format!("# rr-cache configuration\n\n{}", body);
        write_atomic(&self.config_path, content.as_bytes()).await?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.cache.mnx_version, "4.4");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.cache.strict_rebuild = true;
        config.cache.attrs = vec!["cid_strc".to_string()];

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert!(loaded.cache.strict_rebuild);
        assert_eq!(loaded.cache.attrs, vec!["cid_strc"]);
    }

    #[tokio::test]
    async fn saved_file_carries_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        ConfigManager::with_path(path.clone())
            .save(&Config::default())
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# rr-cache configuration"));
        assert!(!temp.path().join(".config.toml.tmp").exists());
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let manager = ConfigManager::with_path(PathBuf::from("/etc/rr-cache.toml"));
        let err = manager
            .parse("[general]\nlog_format = \"yaml\"\n")
            .unwrap_err();
        assert!(matches!(err, CacheError::ConfigInvalid { reason, .. } if reason.contains("log_format")));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let manager = ConfigManager::with_path(PathBuf::from("/etc/rr-cache.toml"));
        assert!(manager.parse("[network]\ntimeout_secs = 0\n").is_err());
        assert!(manager.parse("[network]\ntimeout_secs = 30\n").is_ok());
    }

    #[tokio::test]
    async fn invalid_file_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\nstrict_rebuild = \"maybe\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, CacheError::ConfigInvalid { path: p, .. } if p == path));
    }
}
