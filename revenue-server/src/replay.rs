//! The `replay` command: one batch run over an event log.

use revenue_core::config::StorageFailurePolicy;
use revenue_core::events::{FileEventSource, SourceError};
use revenue_core::processors::{AggregationEngine, BatchError, BatchSummary};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Drain the log at `path` into the engine's balance store.
pub async fn run_replay(
    engine: &AggregationEngine,
    path: &Path,
    policy: StorageFailurePolicy,
) -> Result<BatchSummary, ReplayError> {
    let mut source = FileEventSource::open(path).await?;
    tracing::info!(path = ?source.path(), "Replaying event log");
    let summary = engine.run_batch(&mut source, policy).await?;
    Ok(summary)
}
