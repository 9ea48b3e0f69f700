//! AggregationEngine processor.
//!
//! The AggregationEngine is responsible for:
//! - Decoding raw records into events
//! - Resolving the processing strategy for each event kind
//! - Computing the delta and applying it to the balance store
//! - Serving single events from the live path and draining whole sources
//!   on the batch path
//!
//! The engine holds no state between invocations. Everything it writes goes
//! through [`BalanceStore::apply_delta`], which is the only serialization
//! point; live requests and batch runs may hit the same user concurrently.

use crate::config::StorageFailurePolicy;
use crate::events::{DecodeError, EventDecoder, EventSource, RawRecord, SourceError};
use crate::store::{Balance, BalanceStore, StorageError};
use crate::strategies::StrategyRegistry;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// What happened to one successfully consumed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The delta was applied; `balance` is the user's revenue afterwards.
    Applied {
        user_id: String,
        delta: i64,
        balance: i64,
    },
    /// No strategy is bound to this kind. The event was skipped.
    Unhandled { kind: String },
}

/// Why a live submission was not accepted.
#[derive(Debug, Error)]
pub enum LiveRejection {
    #[error(transparent)]
    Malformed(#[from] DecodeError),

    /// The request carried no record at all.
    #[error("request carried no event record")]
    Empty,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Counts reported at the end of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub applied: u64,
    pub skipped_unhandled_kind: u64,
    pub failed_decode: u64,
    pub failed_storage: u64,
}

impl BatchSummary {
    /// Number of records consumed from the source.
    pub fn total(&self) -> u64 {
        self.applied + self.skipped_unhandled_kind + self.failed_decode + self.failed_storage
    }

    pub fn is_clean(&self) -> bool {
        self.total() == self.applied
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "applied={} skipped_unhandled_kind={} failed_decode={} failed_storage={}",
            self.applied, self.skipped_unhandled_kind, self.failed_decode, self.failed_storage
        )
    }
}

/// A batch run that could not finish. Carries the counts up to the failure.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("event source failed ({summary}): {source}")]
    Source {
        summary: BatchSummary,
        source: SourceError,
    },

    #[error("batch aborted on storage failure at line {line} ({summary}): {source}")]
    Aborted {
        summary: BatchSummary,
        line: u64,
        source: StorageError,
    },
}

impl BatchError {
    pub fn summary(&self) -> &BatchSummary {
        match self {
            BatchError::Source { summary, .. } => summary,
            BatchError::Aborted { summary, .. } => summary,
        }
    }
}

/// Per-event failure inside the shared pipeline.
#[derive(Debug)]
enum EventFailure {
    Decode(DecodeError),
    Storage {
        user_id: String,
        source: StorageError,
    },
}

/// Turns raw event records into balance mutations.
#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn BalanceStore>,
    registry: StrategyRegistry,
    decoder: EventDecoder,
}

impl AggregationEngine {
    /// Create a new AggregationEngine.
    ///
    /// # Arguments
    ///
    /// * `store` - Balance store shared with every other user of it
    /// * `registry` - Kind → strategy bindings
    pub fn new(store: Arc<dyn BalanceStore>, registry: StrategyRegistry) -> Self {
        Self {
            store,
            registry,
            decoder: EventDecoder,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// decode → resolve strategy → compute delta → apply.
    async fn process_record(&self, record: &RawRecord) -> Result<EventOutcome, EventFailure> {
        let event = self
            .decoder
            .decode(&record.text)
            .map_err(EventFailure::Decode)?;

        let Some(strategy) = self.registry.resolve(&event.name) else {
            return Ok(EventOutcome::Unhandled { kind: event.name });
        };
        let delta = strategy.delta(&event);

        match self.store.apply_delta(&event.user_id, delta).await {
            Ok(balance) => Ok(EventOutcome::Applied {
                user_id: event.user_id,
                delta,
                balance,
            }),
            Err(source) => Err(EventFailure::Storage {
                user_id: event.user_id,
                source,
            }),
        }
    }

    /// Live path: process the one record carried by `source`.
    ///
    /// Decode and storage failures are returned to the caller. Nothing is
    /// retried.
    pub async fn submit<S: EventSource>(&self, mut source: S) -> Result<EventOutcome, LiveRejection> {
        let record = source.next_record().await?.ok_or(LiveRejection::Empty)?;

        match self.process_record(&record).await {
            Ok(outcome) => {
                match &outcome {
                    EventOutcome::Applied {
                        user_id,
                        delta,
                        balance,
                    } => {
                        debug!(user_id = %user_id, delta, balance, "Applied live event");
                    }
                    EventOutcome::Unhandled { kind } => {
                        warn!(kind = %kind, "Unhandled event kind on live path");
                    }
                }
                Ok(outcome)
            }
            Err(EventFailure::Decode(e)) => {
                warn!(error = %e, raw = %e.raw(), "Rejected malformed live event");
                Err(LiveRejection::Malformed(e))
            }
            Err(EventFailure::Storage { user_id, source }) => {
                error!(user_id = %user_id, error = %source, "Failed to apply live event");
                Err(LiveRejection::Storage(source))
            }
        }
    }

    /// Batch path: drain `source` to exhaustion.
    ///
    /// Malformed records and unhandled kinds are logged, counted, and
    /// skipped. A storage failure is logged and counted, then either skipped
    /// or turned into [`BatchError::Aborted`] according to `policy`. A
    /// source failure always ends the run with [`BatchError::Source`].
    pub async fn run_batch<S: EventSource + ?Sized>(
        &self,
        source: &mut S,
        policy: StorageFailurePolicy,
    ) -> Result<BatchSummary, BatchError> {
        let mut summary = BatchSummary::default();
        info!(policy = %policy, "Batch replay started");

        loop {
            let record = match source.next_record().await {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(source) => {
                    error!(error = %source, summary = %summary, "Event source failed, stopping batch");
                    return Err(BatchError::Source { summary, source });
                }
            };

            match self.process_record(&record).await {
                Ok(EventOutcome::Applied {
                    user_id,
                    delta,
                    balance,
                }) => {
                    summary.applied += 1;
                    debug!(line = record.line, user_id = %user_id, delta, balance, "Applied event");
                }
                Ok(EventOutcome::Unhandled { kind }) => {
                    summary.skipped_unhandled_kind += 1;
                    warn!(line = record.line, kind = %kind, "Unhandled event kind, skipping");
                }
                Err(EventFailure::Decode(e)) => {
                    summary.failed_decode += 1;
                    warn!(line = record.line, error = %e, raw = %e.raw(), "Malformed event record, skipping");
                }
                Err(EventFailure::Storage { user_id, source }) => {
                    summary.failed_storage += 1;
                    error!(
                        line = record.line,
                        user_id = %user_id,
                        error = %source,
                        "Failed to apply event"
                    );
                    if policy == StorageFailurePolicy::Abort {
                        return Err(BatchError::Aborted {
                            summary,
                            line: record.line,
                            source,
                        });
                    }
                }
            }
        }

        info!(
            applied = summary.applied,
            skipped_unhandled_kind = summary.skipped_unhandled_kind,
            failed_decode = summary.failed_decode,
            failed_storage = summary.failed_storage,
            "Batch replay finished"
        );
        Ok(summary)
    }

    /// Point lookup of a user's balance.
    pub async fn balance(&self, user_id: &str) -> Result<Option<Balance>, StorageError> {
        self.store.get(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SingleRecordSource;
    use crate::store::MemoryBalanceStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Yields the given lines, then optionally a read failure.
    struct LinesSource {
        lines: VecDeque<String>,
        line: u64,
        fail_at_end: bool,
    }

    impl LinesSource {
        fn new(text: &str) -> Self {
            Self {
                lines: text
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(str::to_owned)
                    .collect(),
                line: 0,
                fail_at_end: false,
            }
        }

        fn failing(text: &str) -> Self {
            Self {
                fail_at_end: true,
                ..Self::new(text)
            }
        }
    }

    #[async_trait]
    impl EventSource for LinesSource {
        async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
            self.line += 1;
            match self.lines.pop_front() {
                Some(text) => Ok(Some(RawRecord::new(self.line, text))),
                None if self.fail_at_end => Err(SourceError::Read {
                    line: self.line,
                    source: std::io::Error::other("connection reset"),
                }),
                None => Ok(None),
            }
        }
    }

    /// Fails every write for `bad_user`, delegates the rest.
    struct FlakyStore {
        inner: MemoryBalanceStore,
        bad_user: &'static str,
        failures: AtomicUsize,
    }

    impl FlakyStore {
        fn new(bad_user: &'static str) -> Self {
            Self {
                inner: MemoryBalanceStore::new(),
                bad_user,
                failures: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BalanceStore for FlakyStore {
        async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<i64, StorageError> {
            if user_id == self.bad_user {
                self.failures.fetch_add(1, Ordering::Relaxed);
                return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.apply_delta(user_id, delta).await
        }

        async fn get(&self, user_id: &str) -> Result<Option<Balance>, StorageError> {
            self.inner.get(user_id).await
        }
    }

    fn engine() -> (AggregationEngine, Arc<MemoryBalanceStore>) {
        let store = Arc::new(MemoryBalanceStore::new());
        let engine = AggregationEngine::new(store.clone(), StrategyRegistry::with_defaults());
        (engine, store)
    }

    async fn revenue(engine: &AggregationEngine, user_id: &str) -> Option<i64> {
        engine.balance(user_id).await.unwrap().map(|b| b.revenue)
    }

    #[tokio::test]
    async fn test_batch_end_to_end() {
        let (engine, _) = engine();
        let mut source = LinesSource::new(
            r#"{"userId":"u1","name":"add_revenue","value":98}
{"userId":"u1","name":"subtract_revenue","value":72}
{"userId":"u2","name":"add_revenue","value":70}"#,
        );

        let summary = engine
            .run_batch(&mut source, StorageFailurePolicy::Continue)
            .await
            .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                applied: 3,
                ..Default::default()
            }
        );
        assert!(summary.is_clean());
        assert_eq!(revenue(&engine, "u1").await, Some(26));
        assert_eq!(revenue(&engine, "u2").await, Some(70));
    }

    #[tokio::test]
    async fn test_batch_skips_malformed_line() {
        let (engine, _) = engine();
        let mut source = LinesSource::new(
            "{\"userId\":\"u1\",\"name\":\"add_revenue\",\"value\":10}\nNOT JSON\n{\"userId\":\"u1\",\"name\":\"add_revenue\",\"value\":5}",
        );

        let summary = engine
            .run_batch(&mut source, StorageFailurePolicy::Continue)
            .await
            .unwrap();

        assert_eq!(summary.applied, 2);
        assert_eq!(summary.failed_decode, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(revenue(&engine, "u1").await, Some(15));
    }

    #[tokio::test]
    async fn test_batch_skips_unhandled_kind() {
        let (engine, store) = engine();
        let mut source = LinesSource::new(
            r#"{"userId":"u1","name":"refund","value":10}
{"userId":"u2","name":"add_revenue","value":1}"#,
        );

        let summary = engine
            .run_batch(&mut source, StorageFailurePolicy::Continue)
            .await
            .unwrap();

        assert_eq!(summary.skipped_unhandled_kind, 1);
        assert_eq!(summary.applied, 1);
        assert_eq!(revenue(&engine, "u1").await, None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_batch_continues_past_storage_failure() {
        let store = Arc::new(FlakyStore::new("broken"));
        let engine = AggregationEngine::new(store.clone(), StrategyRegistry::with_defaults());
        let mut source = LinesSource::new(
            r#"{"userId":"broken","name":"add_revenue","value":10}
{"userId":"u1","name":"add_revenue","value":4}
{"userId":"broken","name":"subtract_revenue","value":1}"#,
        );

        let summary = engine
            .run_batch(&mut source, StorageFailurePolicy::Continue)
            .await
            .unwrap();

        assert_eq!(summary.failed_storage, 2);
        assert_eq!(summary.applied, 1);
        assert_eq!(store.failures.load(Ordering::Relaxed), 2);
        assert_eq!(revenue(&engine, "u1").await, Some(4));
    }

    #[tokio::test]
    async fn test_batch_abort_policy_stops_at_first_storage_failure() {
        let store = Arc::new(FlakyStore::new("broken"));
        let engine = AggregationEngine::new(store.clone(), StrategyRegistry::with_defaults());
        let mut source = LinesSource::new(
            r#"{"userId":"u1","name":"add_revenue","value":4}
{"userId":"broken","name":"add_revenue","value":10}
{"userId":"u1","name":"add_revenue","value":4}"#,
        );

        let err = engine
            .run_batch(&mut source, StorageFailurePolicy::Abort)
            .await
            .unwrap_err();

        match &err {
            BatchError::Aborted { summary, line, .. } => {
                assert_eq!(*line, 2);
                assert_eq!(summary.applied, 1);
                assert_eq!(summary.failed_storage, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(revenue(&engine, "u1").await, Some(4));
    }

    #[tokio::test]
    async fn test_batch_source_failure_reports_partial_summary() {
        let (engine, _) = engine();
        let mut source = LinesSource::failing(r#"{"userId":"u1","name":"add_revenue","value":4}"#);

        let err = engine
            .run_batch(&mut source, StorageFailurePolicy::Continue)
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::Source { .. }));
        assert_eq!(err.summary().applied, 1);
        assert_eq!(revenue(&engine, "u1").await, Some(4));
    }

    #[tokio::test]
    async fn test_split_batches_match_single_batch() {
        let lines = [
            r#"{"userId":"u1","name":"add_revenue","value":98}"#,
            r#"{"userId":"u1","name":"subtract_revenue","value":72}"#,
            r#"{"userId":"u1","name":"add_revenue","value":13}"#,
            r#"{"userId":"u1","name":"subtract_revenue","value":200}"#,
        ];

        let (single, _) = engine();
        let mut all = LinesSource::new(&lines.join("\n"));
        single
            .run_batch(&mut all, StorageFailurePolicy::Continue)
            .await
            .unwrap();

        let (split, _) = engine();
        for chunk in lines.chunks(2) {
            let mut part = LinesSource::new(&chunk.join("\n"));
            split
                .run_batch(&mut part, StorageFailurePolicy::Continue)
                .await
                .unwrap();
        }

        assert_eq!(revenue(&single, "u1").await, Some(-161));
        assert_eq!(revenue(&split, "u1").await, Some(-161));
    }

    #[tokio::test]
    async fn test_empty_source_yields_empty_summary() {
        let (engine, store) = engine();
        let summary = engine
            .run_batch(&mut LinesSource::new(""), StorageFailurePolicy::Continue)
            .await
            .unwrap();
        assert_eq!(summary, BatchSummary::default());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_submit_applies_event() {
        let (engine, _) = engine();
        let outcome = engine
            .submit(SingleRecordSource::new(
                r#"{"userId":"u1","name":"add_revenue","value":10}"#,
            ))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            EventOutcome::Applied {
                user_id: "u1".to_string(),
                delta: 10,
                balance: 10,
            }
        );
    }

    #[tokio::test]
    async fn test_submit_malformed_is_rejected() {
        let (engine, store) = engine();
        let err = engine
            .submit(SingleRecordSource::new("{\"userId\":\"u1\""))
            .await
            .unwrap_err();
        assert!(matches!(err, LiveRejection::Malformed(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_submit_unhandled_kind_is_accepted_without_effect() {
        let (engine, store) = engine();
        let outcome = engine
            .submit(SingleRecordSource::new(
                r#"{"userId":"u1","name":"refund","value":10}"#,
            ))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            EventOutcome::Unhandled {
                kind: "refund".to_string()
            }
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_submit_storage_failure_is_rejected() {
        let engine = AggregationEngine::new(
            Arc::new(FlakyStore::new("u1")),
            StrategyRegistry::with_defaults(),
        );
        let err = engine
            .submit(SingleRecordSource::new(
                r#"{"userId":"u1","name":"add_revenue","value":10}"#,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, LiveRejection::Storage(_)));
    }

    #[tokio::test]
    async fn test_submit_empty_source_is_rejected() {
        let (engine, _) = engine();
        let err = engine.submit(LinesSource::new("")).await.unwrap_err();
        assert!(matches!(err, LiveRejection::Empty));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_live_and_batch_compose() {
        let (engine, _) = engine();
        let engine = Arc::new(engine);

        let batch = tokio::spawn({
            let engine = engine.clone();
            async move {
                let text = (0..50)
                    .map(|_| r#"{"userId":"u1","name":"add_revenue","value":2}"#)
                    .collect::<Vec<_>>()
                    .join("\n");
                engine
                    .run_batch(&mut LinesSource::new(&text), StorageFailurePolicy::Continue)
                    .await
            }
        });

        let mut live = Vec::new();
        for _ in 0..50 {
            let engine = engine.clone();
            live.push(tokio::spawn(async move {
                engine
                    .submit(SingleRecordSource::new(
                        r#"{"userId":"u1","name":"subtract_revenue","value":1}"#,
                    ))
                    .await
            }));
        }

        assert_eq!(batch.await.unwrap().unwrap().applied, 50);
        for handle in live {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(revenue(&engine, "u1").await, Some(50));
    }

    #[tokio::test]
    async fn test_summary_serializes_camel_case() {
        let summary = BatchSummary {
            applied: 2,
            skipped_unhandled_kind: 1,
            failed_decode: 1,
            failed_storage: 0,
        };
        let value = serde_json::to_value(summary).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "applied": 2,
                "skippedUnhandledKind": 1,
                "failedDecode": 1,
                "failedStorage": 0
            })
        );
    }
}
