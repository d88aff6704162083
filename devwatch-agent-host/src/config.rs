//! Agent configuration from `config.json` in the working directory.
//!
//! Keys keep the collector's historical names:
//! `SERVER_URL`, `DATA_INTERVAL_SECONDS`, `ACCEPT_INVALID_CERTS`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(rename = "SERVER_URL", default = "default_server_url")]
    pub server_url: String,
    #[serde(rename = "DATA_INTERVAL_SECONDS", default = "default_interval")]
    pub data_interval_seconds: u64,
    /// The kernel ships a self-signed certificate
    #[serde(rename = "ACCEPT_INVALID_CERTS", default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

fn default_server_url() -> String {
    "https://localhost:3000/api/device-info".to_string()
}

fn default_interval() -> u64 {
    15
}

fn default_accept_invalid_certs() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            data_interval_seconds: default_interval(),
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

impl AgentConfig {
    pub async fn load() -> Result<Self> {
        Self::load_from(Self::config_file_path()?).await
    }

    /// Missing file means defaults; an unreadable or malformed one is an error.
    pub async fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("Config file not found, using default values.");
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: AgentConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(std::env::current_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_config() {
        let dir = TempDir::new().unwrap();
        let config = AgentConfig::load_from(dir.path().join("config.json")).await.unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.data_interval_seconds, 15);
        assert!(config.server_url.ends_with("/api/device-info"));
    }

    #[tokio::test]
    async fn test_partial_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"SERVER_URL": "https://10.0.0.5:3000/api/device-info"}"#).unwrap();

        let config = AgentConfig::load_from(&path).await.unwrap();
        assert_eq!(config.server_url, "https://10.0.0.5:3000/api/device-info");
        assert_eq!(config.data_interval_seconds, 15);
        assert!(config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_malformed_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(AgentConfig::load_from(&path).await.is_err());
    }

    #[test]
    fn test_config_file_path() {
        let path = AgentConfig::config_file_path().unwrap();
        assert!(path.ends_with("config.json"));
    }
}
