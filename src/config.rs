//! Service configuration, persisted as TOML.
//!
//! Resolution order: built-in defaults, then `server.toml` in the XDG config
//! directory (if present), then `EBB_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::EbbPaths;

/// Which graph store backend the ingest service writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// redb database under `data_dir`.
    #[default]
    Durable,
    /// In-process petgraph graph; nothing survives a restart.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "durable" => Ok(Self::Durable),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidValue {
                key: "backend".into(),
                value: other.into(),
                expected: "Use \"durable\" or \"memory\".".into(),
            }),
        }
    }
}

/// Configuration for the ingest service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Interface to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Graph store backend.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory for the durable store. `None` uses the XDG data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Largest accepted upload body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8200
}
fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            backend: StoreBackend::default(),
            data_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServiceConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a config file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Defaults, then the XDG config file if it exists, then the environment.
    pub fn resolve(paths: &EbbPaths) -> Result<Self, ConfigError> {
        let file = paths.server_config_file();
        let config = if file.is_file() {
            tracing::info!(path = %file.display(), "loading service config");
            Self::load(&file)?
        } else {
            Self::default()
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Apply `EBB_SERVER_BIND`, `EBB_SERVER_PORT`, `EBB_DATA_DIR` and
    /// `EBB_BACKEND` overrides from the given lookup.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(bind) = var("EBB_SERVER_BIND") {
            self.bind = bind;
        }
        if let Some(port) = var("EBB_SERVER_PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "EBB_SERVER_PORT".into(),
                value: port.clone(),
                expected: "Use a TCP port number between 0 and 65535.".into(),
            })?;
        }
        if let Some(dir) = var("EBB_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(backend) = var("EBB_BACKEND") {
            self.backend = backend.parse()?;
        }
        Ok(self)
    }

    /// `bind:port` listen address.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Effective data directory for the durable store.
    pub fn graph_dir(&self, paths: &EbbPaths) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| paths.graph_dir())
    }
}
