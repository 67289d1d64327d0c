//! Configuration schema for rr-cache
//!
//! Configuration is stored at `~/.config/rr-cache/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache location and behaviour
    pub cache: CacheConfig,

    /// Registry and sources descriptors
    pub registry: RegistryConfig,

    /// Download settings
    pub network: NetworkConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory (default: platform cache dir + `rr-cache`)
    pub dir: Option<PathBuf>,

    /// MetaNetX release the artifacts are built from
    pub mnx_version: String,

    /// Fail when a rebuild does not reproduce the published fingerprint
    pub strict_rebuild: bool,

    /// Artifacts loaded when none are named (empty = all)
    pub attrs: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            mnx_version: "4.4".to_string(),
            strict_rebuild: false,
            attrs: Vec::new(),
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Artifact descriptor (default: packaged)
    pub descriptor: Option<PathBuf>,

    /// Raw sources descriptor (default: packaged)
    pub sources: Option<PathBuf>,

    /// JSON object of extra `old -> new` compound ids merged into deprecatedCID_cid
    pub cid_conversions: Option<PathBuf>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Largest accepted download in MB
    pub max_download_mb: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_download_mb: 2048,
        }
    }
}

impl Config {
    /// Root of the cache tree
    pub fn root_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rr-cache")
        })
    }

    /// Directory holding the artifacts of the configured MetaNetX release
    pub fn cache_dir(&self) -> PathBuf {
        self.root_dir()
            .join("cache")
            .join(format!("mnx_{}", self.cache.mnx_version))
    }

    /// Directory holding raw source files
    pub fn input_dir(&self) -> PathBuf {
        self.root_dir()
            .join("input-cache")
            .join(format!("mnx_{}", self.cache.mnx_version))
    }

    /// Check values the type system cannot express
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }
        let version = self.cache.mnx_version.trim();
        if version.is_empty() || version.contains(['/', '\\']) {
            return Err(format!(
                "cache.mnx_version is not a release name: \"{}\"",
                self.cache.mnx_version
            ));
        }
        if self.network.timeout_secs == 0 {
            return Err("network.timeout_secs must be positive".to_string());
        }
        Ok(())
    }

    /// Download size limit in bytes
    pub fn max_download_bytes(&self) -> u64 {
        self.network.max_download_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("mnx_version = \"4.4\""));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.mnx_version, "4.4");
        assert!(!config.cache.strict_rebuild);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            dir = "/data/rr"
            mnx_version = "3.2"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache_dir(), PathBuf::from("/data/rr/cache/mnx_3.2"));
        assert_eq!(config.input_dir(), PathBuf::from("/data/rr/input-cache/mnx_3.2"));
        assert_eq!(config.network.timeout_secs, 300); // default preserved
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn mnx_version_cannot_escape_cache_dir() {
        let mut config = Config::default();
        config.cache.mnx_version = "../4.4".to_string();
        assert!(config.validate().unwrap_err().contains("mnx_version"));
    }

    #[test]
    fn download_limit_in_bytes() {
        let mut config = Config::default();
        config.network.max_download_mb = 2;
        assert_eq!(config.max_download_bytes(), 2 * 1024 * 1024);
    }
}
