//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the token storage backend, and the last
//! email used to log in.
//!
//! Configuration is stored at `~/.config/portal/config.json`. Setting
//! `PORTAL_HOME` moves both config and token storage under that directory.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::auth::{FileStore, KeyringStore, TokenStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "portal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const HOME_ENV: &str = "PORTAL_HOME";
pub const API_URL_ENV: &str = "PORTAL_API_URL";
pub const TOKEN_BACKEND_ENV: &str = "PORTAL_TOKEN_BACKEND";

/// Where the token pair is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for TokenBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(TokenBackend::File),
            "keyring" | "keychain" => Ok(TokenBackend::Keyring),
            "memory" => Ok(TokenBackend::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown token backend '{}' (expected file, keyring or memory)",
                other
            )),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub token_backend: TokenBackend,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_base_url(),
            token_backend: TokenBackend::default(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Persist `email` as the last login, leaving the rest of the file as is.
    /// Environment overrides are not written back.
    pub fn remember_email(email: &str) -> Result<()> {
        let path = Self::config_path()?;
        let mut on_disk = Self::load_from(&path)?;
        on_disk.last_email = Some(email.to_string());
        on_disk.save_to(&path)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(backend) = lookup(TOKEN_BACKEND_ENV).filter(|v| !v.trim().is_empty()) {
            self.token_backend = backend
                .parse()
                .with_context(|| format!("Invalid {}", TOKEN_BACKEND_ENV))?;
        }
        Ok(())
    }

    fn home_override() -> Option<PathBuf> {
        std::env::var_os(HOME_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn config_path() -> Result<PathBuf> {
        if let Some(home) = Self::home_override() {
            return Ok(home.join(CONFIG_FILE));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(home) = Self::home_override() {
            return Ok(home);
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Build the token store for the configured backend
    pub fn token_store(&self) -> Result<TokenStore> {
        Ok(match self.token_backend {
            TokenBackend::File => TokenStore::new(FileStore::in_dir(&self.data_dir()?)),
            TokenBackend::Keyring => TokenStore::new(KeyringStore::new()),
            TokenBackend::Memory => TokenStore::in_memory(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.token_backend, TokenBackend::File);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            api_base_url: "https://api.example.com".to_string(),
            token_backend: TokenBackend::Keyring,
            last_email: Some("ana@example.com".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, "https://api.example.com");
        assert_eq!(loaded.token_backend, TokenBackend::Keyring);
        assert_eq!(loaded.last_email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"token_backend":"memory"}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, DEFAULT_BASE_URL);
        assert_eq!(loaded.token_backend, TokenBackend::Memory);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (API_URL_ENV, "http://127.0.0.1:9999/api"),
            (TOKEN_BACKEND_ENV, "Keychain"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:9999/api");
        assert_eq!(config.token_backend, TokenBackend::Keyring);
    }

    #[test]
    fn test_invalid_backend_override_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_overrides(|k| {
            (k == TOKEN_BACKEND_ENV).then(|| "floppy".to_string())
        });
        assert!(result.is_err());
    }
}
