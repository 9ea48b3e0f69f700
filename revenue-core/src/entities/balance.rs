use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

/// One row of the `user_revenue` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Balance {
    pub user_id: String,
    pub revenue: i64,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone)]
/// Add `delta` to a user's revenue, creating the row on first use.
///
/// A single `INSERT ... ON CONFLICT DO UPDATE` statement, so concurrent
/// deltas for the same user are serialized by the row lock Postgres takes
/// on conflict and none of them is lost. Returns the resulting revenue.
pub struct ApplyRevenueDelta {
    pub user_id: String,
    pub delta: i64,
}

impl Processor<ApplyRevenueDelta> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ApplyRevenueDelta")]
    async fn process(&self, cmd: ApplyRevenueDelta) -> Result<i64, sqlx::Error> {
        let revenue = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO user_revenue (user_id, revenue)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET revenue = user_revenue.revenue + EXCLUDED.revenue,
                updated_at = NOW()
            RETURNING revenue
            "#,
        )
        .bind(&cmd.user_id)
        .bind(cmd.delta)
        .fetch_one(&self.pool)
        .await?;
        Ok(revenue)
    }
}

#[derive(Debug, Clone)]
/// Point lookup of a user's balance row.
pub struct GetBalanceByUserId {
    pub user_id: String,
}

impl Processor<GetBalanceByUserId> for DatabaseProcessor {
    type Output = Option<Balance>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetBalanceByUserId")]
    async fn process(&self, query: GetBalanceByUserId) -> Result<Option<Balance>, sqlx::Error> {
        let balance = sqlx::query_as::<_, Balance>(
            r#"
            SELECT user_id, revenue, created_at, updated_at
            FROM user_revenue
            WHERE user_id = $1
            "#,
        )
        .bind(&query.user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(balance)
    }
}
