//! Kind → strategy dispatch table.

use super::{ProcessingStrategy, RevenueStrategy};
use revenue_sdk::objects::event::{ADD_REVENUE, SUBTRACT_REVENUE};
use std::collections::HashMap;
use std::sync::Arc;

/// Open mapping from event kind to the strategy that handles it.
///
/// Lookup is by exact kind string. New kinds are added with
/// [`register`](StrategyRegistry::register); existing strategies are never
/// touched to do so.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    bindings: HashMap<String, Arc<dyn ProcessingStrategy>>,
}

impl StrategyRegistry {
    /// An empty registry. Every kind resolves to `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// The startup table: `add_revenue` and `subtract_revenue`, both bound
    /// to [`RevenueStrategy`].
    pub fn with_defaults() -> Self {
        let revenue: Arc<dyn ProcessingStrategy> = Arc::new(RevenueStrategy);
        Self::new()
            .with(ADD_REVENUE, revenue.clone())
            .with(SUBTRACT_REVENUE, revenue)
    }

    /// Bind `kind` to `strategy`, returning the previous binding if any.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        strategy: Arc<dyn ProcessingStrategy>,
    ) -> Option<Arc<dyn ProcessingStrategy>> {
        self.bindings.insert(kind.into(), strategy)
    }

    /// Builder form of [`register`](StrategyRegistry::register).
    pub fn with(mut self, kind: impl Into<String>, strategy: Arc<dyn ProcessingStrategy>) -> Self {
        self.register(kind, strategy);
        self
    }

    /// `None` means the kind is unhandled, which is not an error.
    pub fn resolve(&self, kind: &str) -> Option<&dyn ProcessingStrategy> {
        self.bindings.get(kind).map(|strategy| strategy.as_ref())
    }

    /// Bound kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
