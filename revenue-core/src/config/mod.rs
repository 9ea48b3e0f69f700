//! Validated runtime configuration.
//!
//! These types are what the engine and server run with. Loading and parsing
//! the TOML file is handled by the server crate.

mod auth;
mod database;
mod replay;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use replay::{ReplayConfig, StorageFailurePolicy};
pub use server::ServerConfig;
