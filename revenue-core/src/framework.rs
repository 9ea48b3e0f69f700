use sqlx::PgPool;

/// Executes query objects against the shared connection pool.
///
/// Every query is a small struct with a `kanau::processor::Processor` impl on
/// this type. A connection is checked out for the duration of one statement
/// and returned to the pool right after.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
