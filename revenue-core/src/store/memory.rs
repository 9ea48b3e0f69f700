use super::{Balance, BalanceStore, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-process balance store.
///
/// Used by tests and for running the server without a database. Contents
/// are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryBalanceStore {
    rows: Mutex<HashMap<String, Balance>>,
}

impl MemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a balance row.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

fn now() -> time::PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    time::PrimitiveDateTime::new(now.date(), now.time())
}

#[async_trait]
impl BalanceStore for MemoryBalanceStore {
    async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<i64, StorageError> {
        let mut rows = self.rows.lock().await;
        let now = now();
        match rows.get_mut(user_id) {
            Some(row) => {
                row.revenue = row
                    .revenue
                    .checked_add(delta)
                    .ok_or_else(|| StorageError::Overflow {
                        user_id: user_id.to_owned(),
                    })?;
                row.updated_at = now;
                Ok(row.revenue)
            }
            None => {
                rows.insert(
                    user_id.to_owned(),
                    Balance {
                        user_id: user_id.to_owned(),
                        revenue: delta,
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(delta)
            }
        }
    }

    async fn get(&self, user_id: &str) -> Result<Option<Balance>, StorageError> {
        Ok(self.rows.lock().await.get(user_id).cloned())
    }
}
