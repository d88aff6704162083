use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_ENV_VAR: &str = "DEVWATCH_KERNEL_CONFIG";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KernelConfig {
    #[serde(default)]
    pub server: ServerConf,
    /// `tls: ~` in the YAML disables HTTPS (dev only)
    #[serde(default = "default_tls")]
    pub tls: Option<TlsConf>,
    #[serde(default)]
    pub storage: StorageConf,
}

/// Exposed as-is by `GET /config`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerConf {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TlsConf {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StorageConf {
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_partition_suffix")]
    pub partition_suffix: String,
}

impl Default for ServerConf {
    fn default() -> Self {
        Self { ip: "0.0.0.0".into(), port: 3000 }
    }
}

impl Default for StorageConf {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/metricsdb.sqlite"),
            pool_size: default_pool_size(),
            partition_suffix: default_partition_suffix(),
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            server: ServerConf::default(),
            tls: default_tls(),
            storage: StorageConf::default(),
        }
    }
}

fn default_tls() -> Option<TlsConf> {
    Some(TlsConf {
        cert: PathBuf::from("./key/cert.pem"),
        key: PathBuf::from("./key/key.pem"),
    })
}

fn default_pool_size() -> u32 {
    8
}

fn default_partition_suffix() -> String {
    "_metrics".into()
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| "kernel.yaml".into());
    load_config_from(&path).await
}

/// Never fails: missing, empty or invalid files fall back to defaults.
pub async fn load_config_from<P: AsRef<Path>>(path: P) -> KernelConfig {
    let path = path.as_ref();
    if !path.exists() {
        warn!("no {}, using default config", path.display());
        return KernelConfig::default();
    }
    let txt = fs::read_to_string(path).await.unwrap_or_default();
    if txt.trim().is_empty() {
        return KernelConfig::default();
    }
    match serde_yaml::from_str(&txt) {
        Ok(cfg) => {
            info!("config loaded from {}", path.display());
            cfg
        }
        Err(e) => {
            warn!("invalid config {}: {e}", path.display());
            KernelConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(dir.path().join("nope.yaml")).await;
        assert_eq!(cfg, KernelConfig::default());
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.storage.partition_suffix, "_metrics");
    }

    #[tokio::test]
    async fn test_partial_yaml_and_tls_disabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kernel.yaml");
        std::fs::write(
            &path,
            "server:\n  ip: 127.0.0.1\n  port: 8443\ntls: ~\nstorage:\n  path: /tmp/m.sqlite\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).await;
        assert_eq!(cfg.server, ServerConf { ip: "127.0.0.1".into(), port: 8443 });
        assert!(cfg.tls.is_none());
        assert_eq!(cfg.storage.path, PathBuf::from("/tmp/m.sqlite"));
        assert_eq!(cfg.storage.pool_size, 8);
    }

    #[tokio::test]
    async fn test_invalid_yaml_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kernel.yaml");
        std::fs::write(&path, "server: [not, a, map]\n").unwrap();

        let cfg = load_config_from(&path).await;
        assert_eq!(cfg, KernelConfig::default());
    }
}
