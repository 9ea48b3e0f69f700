//! Persistent user → revenue balances.
//!
//! The store is the only place balance state lives. It is constructed once
//! per process and shared as `Arc<dyn BalanceStore>`.

pub mod memory;
pub mod postgres;

pub use crate::entities::balance::Balance;
pub use memory::MemoryBalanceStore;
pub use postgres::PgBalanceStore;

use async_trait::async_trait;
use thiserror::Error;

/// Failure at the persistence boundary. Never retried inside the store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error (connection, timeout, constraint, numeric overflow).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the delta would leave the balance outside the `i64` range.
    #[error("revenue overflow for user {user_id}")]
    Overflow { user_id: String },
}

/// Mapping from user identifier to integer revenue balance.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Atomically add `delta` to the user's revenue, creating the row with
    /// `revenue = delta` if it does not exist. Returns the new revenue.
    ///
    /// Concurrent calls for the same user compose: the final revenue is the
    /// sum of every applied delta regardless of interleaving.
    async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<i64, StorageError>;

    /// `None` if no delta was ever applied to this user.
    async fn get(&self, user_id: &str) -> Result<Option<Balance>, StorageError>;
}
