//! Application state shared across all request handlers.

use revenue_core::config::AuthConfig;
use revenue_core::processors::AggregationEngine;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// The engine, which owns the handle to the balance store.
    pub engine: Arc<AggregationEngine>,
    /// Shared-secret verification for event ingestion.
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(engine: AggregationEngine, auth: AuthConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            auth: Arc::new(auth),
        }
    }
}
