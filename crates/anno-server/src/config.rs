use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anno_store::SyncMode;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server configuration, loadable from TOML.
///
/// ```toml
/// bind_addr = "0.0.0.0:8080"
/// max_body_size = 1048576
/// cors_permissive = false
///
/// [storage]
/// backend = "log"
/// path = "/var/lib/anno/store.log"
/// sync = "every-write"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
    pub cors_permissive: bool,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            max_body_size: 1024 * 1024,
            cors_permissive: false,
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}

/// Which key-value backend holds annotations and collections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum StorageConfig {
    /// Process-local map; contents are lost on shutdown.
    #[default]
    Memory,
    /// Append-only log file.
    Log {
        path: PathBuf,
        #[serde(default)]
        sync: SyncMode,
    },
}
