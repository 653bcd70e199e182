//! Configuration schema and loader for the corvid server.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the gRPC services.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Optional Prometheus metrics HTTP port.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            storage: StorageConfig::default(),
            metrics_port: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the change-log file holding all persisted state.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Sync policy: "always", "batch", "none".
    #[serde(default = "default_sync")]
    pub sync: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            sync: default_sync(),
        }
    }
}

// --- Defaults ---

fn default_listen() -> SocketAddr {
    "127.0.0.1:50000".parse().expect("default listen address")
}
fn default_data_file() -> PathBuf {
    PathBuf::from("corvid.db")
}
fn default_sync() -> String {
    "always".to_string()
}

// --- Loading ---

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ServerConfig {
    /// Validate that configuration values are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.data_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.data_file must not be empty".into(),
            ));
        }
        match self.storage.sync.as_str() {
            "always" | "batch" | "none" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "storage.sync must be one of always/batch/none, got {:?}",
                    other
                )));
            }
        }
        Ok(())
    }
}

/// Load a `ServerConfig` from a YAML file path.
pub fn load_from_file(path: &std::path::Path) -> Result<ServerConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: ServerConfig = serde_yaml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Load a `ServerConfig` from a YAML string.
pub fn load_from_str(yaml: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}
