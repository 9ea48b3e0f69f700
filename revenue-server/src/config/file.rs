//! TOML file configuration structures.
//!
//! These structs directly map to the `revenue-config.toml` file format.

use revenue_core::config::StorageFailurePolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Required by `serve`; `replay` never reads it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Ingestion auth section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// The shared bearer secret. If this is plaintext (doesn't start with
    /// `$argon2`), it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Connection pool section. The URL comes from `DATABASE_URL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

/// Batch replay section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default)]
    pub on_storage_error: StorageFailurePolicy,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            on_storage_error: StorageFailurePolicy::default(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("./events.log")
}

impl AuthConfig {
    /// Check if the secret is already hashed (argon2 format).
    pub fn is_hashed(&self) -> bool {
        self.secret.starts_with("$argon2")
    }
}
