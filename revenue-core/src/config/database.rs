use std::time::Duration;

/// Connection pool settings. The URL itself comes from `DATABASE_URL`.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    /// How long an operation waits for a pooled connection before failing
    /// with a storage error.
    pub acquire_timeout: Duration,
}
