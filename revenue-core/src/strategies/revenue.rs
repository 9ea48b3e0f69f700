use super::ProcessingStrategy;
use crate::events::Event;
use revenue_sdk::objects::event::ADD_REVENUE;

/// Credits `add_revenue` events and debits everything else routed here.
///
/// Any kind other than exactly `add_revenue` is treated as a subtraction,
/// so only bind this strategy to kinds that really mean "debit".
///
/// The decoder never produces `value = i64::MIN`. An [`Event`] built by
/// hand with that value is debited by `i64::MAX`, one unit short.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevenueStrategy;

impl ProcessingStrategy for RevenueStrategy {
    fn delta(&self, event: &Event) -> i64 {
        if event.name == ADD_REVENUE {
            event.value
        } else {
            event.value.saturating_neg()
        }
    }
}
