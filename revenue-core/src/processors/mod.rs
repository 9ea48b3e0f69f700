//! Processors that drive events into the balance store.
//!
//! - `AggregationEngine`: decodes records, dispatches them to strategies,
//!   and applies the resulting deltas, for both live submissions and batch
//!   replay.

pub mod aggregation_engine;

pub use aggregation_engine::{
    AggregationEngine, BatchError, BatchSummary, EventOutcome, LiveRejection,
};
