use super::{Balance, BalanceStore, StorageError};
use crate::entities::balance::{ApplyRevenueDelta, GetBalanceByUserId};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;

/// Balance store backed by the `user_revenue` table.
///
/// Per-user serialization comes from `INSERT ... ON CONFLICT DO UPDATE`;
/// no application-level lock is taken.
#[derive(Debug, Clone)]
pub struct PgBalanceStore {
    processor: DatabaseProcessor,
}

impl PgBalanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
        }
    }
}

#[async_trait]
impl BalanceStore for PgBalanceStore {
    async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<i64, StorageError> {
        let revenue = self
            .processor
            .process(ApplyRevenueDelta {
                user_id: user_id.to_owned(),
                delta,
            })
            .await?;
        Ok(revenue)
    }

    async fn get(&self, user_id: &str) -> Result<Option<Balance>, StorageError> {
        let balance = self
            .processor
            .process(GetBalanceByUserId {
                user_id: user_id.to_owned(),
            })
            .await?;
        Ok(balance)
    }
}
