//! Configuration types for LargeOpt
//!
//! Every section carries `#[serde(default)]` so a partial TOML file only
//! overrides the keys it names.

use crate::error::Result;
use crate::types::StorageStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for LargeOpt
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document store configuration
    pub storage: StorageConfig,
    /// Shared cache configuration
    pub cache: CacheConfig,
    /// Option registry configuration
    pub registry: RegistryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Document store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the redb database file
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./largeopt.redb"),
        }
    }
}

/// Shared cache configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Option registry configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Document kind that backs large options
    pub kind: String,
    /// Storage strategy used when no policy hook overrides it
    pub default_strategy: StorageStrategy,
    /// Consult the host configuration store when no document exists
    pub fallback_to_host_config: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kind: "large_option".to_string(),
            default_strategy: StorageStrategy::Embedded,
            fallback_to_host_config: false,
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level (overridden by `RUST_LOG`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.path, PathBuf::from("./largeopt.redb"));
        assert_eq!(config.cache.capacity, 1024);
        assert_eq!(config.registry.kind, "large_option");
        assert_eq!(config.registry.default_strategy, StorageStrategy::Embedded);
        assert!(!config.registry.fallback_to_host_config);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [registry]
            default_strategy = "attached"
            fallback_to_host_config = true

            [cache]
            capacity = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.default_strategy, StorageStrategy::Attached);
        assert!(config.registry.fallback_to_host_config);
        assert_eq!(config.registry.kind, "large_option");
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("largeopt.toml");
        std::fs::write(&path, "[storage]\npath = \"/tmp/opts.redb\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/tmp/opts.redb"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::from_file(dir.path().join("absent.toml")).is_err());
    }
}
