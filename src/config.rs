//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the backend endpoints, the optional identity-provider endpoint,
//! and the last used username.
//!
//! Configuration is stored at `~/.config/claimline/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "claimline";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL for authentication endpoints (the accounts service handles
/// login and token refresh)
const DEFAULT_AUTH_BASE_URL: &str = "https://accounts.claimline.app/api";

/// Base URL for partner data endpoints
const DEFAULT_API_BASE_URL: &str = "https://partner-api.claimline.app";

/// HTTP request timeout in seconds.
/// 30s allows for slow responses on mobile networks while keeping every
/// session check bounded - a network call resolves, it never hangs.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Build the HTTP client shared by all backend-facing components.
/// Clones of the returned client share one connection pool.
pub fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Identity-provider endpoint; federated features are disabled when unset.
    #[serde(default)]
    pub identity_base_url: Option<String>,
    #[serde(default)]
    pub last_username: Option<String>,
}

fn default_auth_base_url() -> String {
    DEFAULT_AUTH_BASE_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_base_url: default_auth_base_url(),
            api_base_url: default_api_base_url(),
            identity_base_url: None,
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for durable app data, including the credential file.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
