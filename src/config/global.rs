//! User-wide configuration.
//!
//! Settings that belong to the machine rather than to a project: which recipe
//! server to talk to by default, an extra CA bundle for corporate proxies and
//! where to keep the response cache.
//!
//! # Location
//!
//! - **Unix/macOS**: `~/.recipe-kit/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\recipe-kit\config.toml`
//! - **Override**: `RECIPES_CONFIG_PATH`
//!
//! ```toml
//! endpoint = "https://recipes.internal.example"
//! cafile = "/etc/ssl/certs/internal-ca.pem"
//! cache_dir = "/var/cache/recipe-kit"
//! ```

use crate::constants::CONFIG_PATH_ENV;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Global configuration; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default recipe endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// PEM bundle trusted in addition to the system roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cafile: Option<PathBuf>,

    /// Root of the response cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl GlobalConfig {
    /// Loads the configuration from `RECIPES_CONFIG_PATH` or the default path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let path = match env(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No global config at {}", path.display());
            Ok(Self::default())
        }
    }

    /// Loads the configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))
    }

    /// Platform-specific default location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error when the home (or local data) directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("recipe-kit")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".recipe-kit")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Platform cache directory for responses, falling back to the temp dir.
    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("recipe-kit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");
        let path_str = path.to_string_lossy().into_owned();

        let config = GlobalConfig::load(&|name: &str| {
            (name == CONFIG_PATH_ENV).then(|| path_str.clone())
        })
        .await
        .unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");
        let config = GlobalConfig {
            endpoint: Some("https://recipes.internal.example".to_string()),
            cafile: Some(PathBuf::from("/etc/ssl/internal.pem")),
            cache_dir: None,
        };

        config.save_to(&path).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("endpoint = \"https://recipes.internal.example\""));
        assert!(!content.contains("cache_dir"));

        assert_eq!(GlobalConfig::load_from(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "endpoint = [").unwrap();

        let err = GlobalConfig::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse global config"));
    }
}
