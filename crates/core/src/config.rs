//! Engine configuration, loaded from `e4s.toml`.
//!
//! A config file in the data directory, defaulted on first open. To
//! change settings, edit the file and restart.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Config file name, placed alongside the durable store's data if any.
pub const CONFIG_FILE_NAME: &str = "e4s.toml";

fn default_cache_max_size() -> usize {
    100_000
}

fn default_persistence_enabled() -> bool {
    false
}

fn default_persistence_schema() -> String {
    "e4s_index".to_string()
}

fn default_persistence_batch_size() -> usize {
    1000
}

fn default_persistence_async_write() -> bool {
    true
}

fn default_flush_interval_ms() -> u64 {
    100
}

/// Engine configuration.
///
/// # Example
///
/// ```toml
/// [index.cache]
/// max-size = 100000
///
/// [index.persistence]
/// enabled = false
/// schema = "e4s_index"
/// batch-size = 1000
/// async-write = true
/// flush-interval-ms = 100
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct E4sConfig {
    /// Cache configuration (C7).
    #[serde(default)]
    pub index: IndexConfig,
}

/// `[index]` section: cache and persistence knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct IndexConfig {
    /// `[index.cache]` section.
    #[serde(default)]
    pub cache: CacheConfig,
    /// `[index.persistence]` section.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Bounded-cache (C7) capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// `index.cache.max-size` — capacity of the hot cache. Default 100,000.
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
}

/// Durable-store (C5) and write-behind (C8) knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PersistenceConfig {
    /// `index.persistence.enabled` — enables the durable-store path. Default false.
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,
    /// `index.persistence.schema` — relational schema name. Default `"e4s_index"`.
    #[serde(default = "default_persistence_schema")]
    pub schema: String,
    /// `index.persistence.batch-size` — durable-store bulk batch size. Default 1000.
    #[serde(default = "default_persistence_batch_size")]
    pub batch_size: usize,
    /// `index.persistence.async-write` — sync vs async durable writes. Default true.
    #[serde(default = "default_persistence_async_write")]
    pub async_write: bool,
    /// `index.persistence.flush-interval-ms` — write-behind flusher period.
    /// `0` disables write-behind (synchronous mode). Default 100.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_cache_max_size(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            schema: default_persistence_schema(),
            batch_size: default_persistence_batch_size(),
            async_write: default_persistence_async_write(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl Default for E4sConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
        }
    }
}

impl E4sConfig {
    /// Default config file content with explanatory comments.
    pub fn default_toml() -> &'static str {
        r#"# e4s-index configuration
#
# Cache configuration (C7 — the bounded hot cache)
[index.cache]
max-size = 100000

# Persistence configuration (C5/C8 — the durable store and write-behind flusher)
[index.persistence]
enabled = false
schema = "e4s_index"
batch-size = 1000
async-write = true
# flush-interval-ms = 0 disables write-behind: every mark is synchronous.
flush-interval-ms = 100
"#
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Fatal(format!("failed to read config file '{}': {}", path.display(), e)))?;
        let config: E4sConfig = toml::from_str(&content)
            .map_err(|e| Error::Fatal(format!("failed to parse config file '{}': {}", path.display(), e)))?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())
                .map_err(|e| Error::Fatal(format!("failed to write config file '{}': {}", path.display(), e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = E4sConfig::default();
        assert_eq!(cfg.index.cache.max_size, 100_000);
        assert!(!cfg.index.persistence.enabled);
        assert_eq!(cfg.index.persistence.schema, "e4s_index");
        assert_eq!(cfg.index.persistence.batch_size, 1000);
        assert!(cfg.index.persistence.async_write);
        assert_eq!(cfg.index.persistence.flush_interval_ms, 100);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = E4sConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: E4sConfig = toml::from_str(&text).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn write_default_if_missing_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        E4sConfig::write_default_if_missing(&path).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        E4sConfig::write_default_if_missing(&path).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let text = "[index.persistence]\nenabled = true\n";
        let cfg: E4sConfig = toml::from_str(text).unwrap();
        assert!(cfg.index.persistence.enabled);
        assert_eq!(cfg.index.cache.max_size, 100_000);
        assert_eq!(cfg.index.persistence.flush_interval_ms, 100);
    }
}
