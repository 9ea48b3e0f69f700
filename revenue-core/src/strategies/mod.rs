//! Processing strategies: per-kind rules that turn an event into a delta.

pub mod registry;
pub mod revenue;

pub use registry::StrategyRegistry;
pub use revenue::RevenueStrategy;

use crate::events::Event;

/// Computes the signed balance delta for one event.
///
/// Implementations must be pure: no I/O, no interior state.
pub trait ProcessingStrategy: Send + Sync {
    fn delta(&self, event: &Event) -> i64;
}
