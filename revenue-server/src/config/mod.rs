//! Configuration module for revenue-server.
//!
//! Handles loading configuration from TOML files and CLI arguments, and
//! hashing the ingestion secret.

pub mod file;

use crate::config::file::FileConfig;
use revenue_core::config::{AuthConfig, DatabaseConfig, ReplayConfig, ServerConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    /// `None` when loaded with [`ConfigLoader::without_auth`].
    pub auth: Option<AuthConfig>,
    pub database: DatabaseConfig,
    pub replay: ReplayConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
    auth_required: bool,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            auth_required: true,
        }
    }

    /// Skip the `[auth]` section entirely: it is neither validated, hashed,
    /// nor written back. Used by commands that never authenticate requests.
    pub fn without_auth(mut self) -> Self {
        self.auth_required = false;
        self
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the secret if it's plaintext (and rewrite the file), unless
    ///    auth is not required
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        self.validate(&file_config)?;

        let secret_hash = if self.auth_required {
            Some(self.resolve_secret_hash(&mut file_config)?)
        } else {
            None
        };

        Ok(build_loaded_config(file_config, secret_hash))
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if self.auth_required {
            match &config.auth {
                None => {
                    return Err(ConfigError::ValidationError(
                        "[auth] section is required".to_string(),
                    ));
                }
                Some(auth) if auth.secret.trim().is_empty() => {
                    return Err(ConfigError::ValidationError(
                        "auth.secret must not be empty".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_secret_hash(&self, file_config: &mut FileConfig) -> Result<String, ConfigError> {
        let Some(auth) = file_config.auth.as_mut() else {
            return Err(ConfigError::ValidationError(
                "[auth] section is required".to_string(),
            ));
        };
        if auth.is_hashed() {
            return Ok(auth.secret.clone());
        }

        let hash = hash_secret(&auth.secret)?;
        auth.secret = hash.clone();
        self.rewrite_config(file_config)?;
        tracing::info!("Ingestion secret hashed and config file updated");
        Ok(hash)
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn hash_secret(plaintext: &str) -> Result<String, ConfigError> {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::HashError(e.to_string()))
}

fn build_loaded_config(file_config: FileConfig, secret_hash: Option<String>) -> LoadedConfig {
    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        auth: secret_hash.map(AuthConfig::new),
        database: DatabaseConfig {
            max_connections: file_config.database.max_connections,
            acquire_timeout: Duration::from_secs(file_config.database.acquire_timeout_secs),
        },
        replay: ReplayConfig {
            log_path: file_config.replay.log_path,
            on_storage_error: file_config.replay.on_storage_error,
        },
    }
}

/// Resolve the database URL given on the command line or in `DATABASE_URL`.
pub fn require_database_url(url: Option<&str>) -> Result<&str, ConfigError> {
    url.filter(|u| !u.is_empty())
        .ok_or(ConfigError::MissingDatabaseUrl)
}
