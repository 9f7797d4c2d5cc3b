//! Client Configuration
//!
//! Loaded from `config.json` in the data directory when present, then
//! overridden from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "config.json";
pub const TOKEN_FILE: &str = "token";

pub const ENV_API_URL: &str = "SNAPSTRONAUT_API_URL";
pub const ENV_DATA_DIR: &str = "SNAPSTRONAUT_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Platform API root, without trailing slash
    pub api_base_url: String,
    /// Third-party position feed
    pub feed_url: String,
    /// How many completions the dashboard asks for
    pub recent_completions: u32,
    pub poll_interval_secs: u64,
    /// No timeout unless set; an elapsed timeout fails the call like any transport error
    pub request_timeout_secs: Option<u64>,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            feed_url: "http://api.open-notify.org/iss-now.json".to_string(),
            recent_completions: 5,
            poll_interval_secs: 5,
            request_timeout_secs: None,
            data_dir: PathBuf::from(".snapstronaut"),
        }
    }
}

impl ClientConfig {
    /// Data directory from the environment, else `~/.snapstronaut`
    pub fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            return PathBuf::from(dir);
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".snapstronaut"))
            .unwrap_or_else(|| PathBuf::from(".snapstronaut"))
    }

    /// Load configuration for `data_dir`, applying process environment overrides
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_dir(data_dir)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read `config.json` from `data_dir`; defaults when the file is absent
    pub fn from_dir(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            serde_json::from_str::<ClientConfig>(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            ClientConfig::default()
        };
        config.data_dir = data_dir.to_path_buf();
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
    }

    pub fn credential_path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
