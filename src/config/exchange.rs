//! Exchange settings.
//!
//! Loaded from the `exchange` key of `~/.folio/config.json`, then overridden
//! by environment variables. Missing file or key means defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings shared by export, import and the orphan sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExchangeConfig {
    /// Blob key prefix all media lives under.
    pub blob_prefix: String,

    /// Path of the upload proxy endpoint recognised in locators.
    pub proxy_path: String,

    /// Query parameter of the proxy endpoint carrying the blob key.
    pub proxy_key_param: String,

    /// Bounded export queue depth, in chunks.
    pub channel_depth: usize,

    /// Size of each chunk handed to the export consumer.
    pub chunk_size: usize,

    /// Number of keys per blob delete call during a sweep.
    pub sweep_batch: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            blob_prefix: "artifacts".to_string(),
            proxy_path: "/api/upload-proxy".to_string(),
            proxy_key_param: "key".to_string(),
            channel_depth: 16,
            chunk_size: 64 * 1024,
            sweep_batch: 500,
        }
    }
}

impl ExchangeConfig {
    /// Apply `FOLIO_BLOB_PREFIX` and `FOLIO_PROXY_PATH` overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(prefix) = std::env::var("FOLIO_BLOB_PREFIX") {
            let prefix = prefix.trim().trim_matches('/');
            if !prefix.is_empty() {
                self.blob_prefix = prefix.to_string();
            }
        }
        if let Ok(path) = std::env::var("FOLIO_PROXY_PATH") {
            if !path.trim().is_empty() {
                self.proxy_path = path.trim().to_string();
            }
        }
        self
    }

    /// Clamp zero-valued sizes to their defaults.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.channel_depth == 0 {
            self.channel_depth = defaults.channel_depth;
        }
        if self.chunk_size == 0 {
            self.chunk_size = defaults.chunk_size;
        }
        if self.sweep_batch == 0 {
            self.sweep_batch = defaults.sweep_batch;
        }
        self.blob_prefix = self.blob_prefix.trim_matches('/').to_string();
        if self.blob_prefix.is_empty() {
            self.blob_prefix = defaults.blob_prefix;
        }
        self
    }
}

/// The on-disk config file. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolioConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<ExchangeConfig>,
}

/// Get the config file path.
fn config_path() -> Result<PathBuf> {
    super::global_folio_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or(Error::Config("Could not determine home directory".into()))
}

/// Load a config file from an explicit path.
///
/// # Errors
///
/// Returns a config error if the file exists but can't be read or parsed.
pub fn load_config_from(path: &Path) -> Result<FolioConfig> {
    if !path.exists() {
        return Ok(FolioConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Resolve the exchange settings: config file, then env, then normalisation.
///
/// # Errors
///
/// Returns a config error if the config file is unreadable or malformed.
pub fn load_exchange_config() -> Result<ExchangeConfig> {
    let config = load_config_from(&config_path()?)?;
    Ok(config
        .exchange
        .unwrap_or_default()
        .with_env_overrides()
        .normalized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.blob_prefix, "artifacts");
        assert_eq!(config.proxy_path, "/api/upload-proxy");
        assert_eq!(config.proxy_key_param, "key");
        assert_eq!(config.channel_depth, 16);
        assert_eq!(config.chunk_size, 65_536);
        assert_eq!(config.sweep_batch, 500);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"exchange": {"blobPrefix": "/media/", "channelDepth": 0}, "other": true}"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap().exchange.unwrap().normalized();
        assert_eq!(config.blob_prefix, "media");
        assert_eq!(config.channel_depth, 16);
        assert_eq!(config.proxy_key_param, "key");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("nope.json")).unwrap();
        assert!(config.exchange.is_none());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_config_from(&path), Err(Error::Config(_))));
    }
}
