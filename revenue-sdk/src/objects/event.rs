//! The event record as it appears on the wire and in replay logs.

use serde::{Deserialize, Serialize};

/// Event kind that credits a user's revenue.
pub const ADD_REVENUE: &str = "add_revenue";
/// Event kind that debits a user's revenue.
pub const SUBTRACT_REVENUE: &str = "subtract_revenue";

/// One revenue-affecting event, encoded as a single JSON object.
///
/// ```json
/// {"userId": "u1", "name": "add_revenue", "value": 98}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub user_id: String,
    /// Event kind tag, e.g. `add_revenue`.
    pub name: String,
    pub value: i64,
}

impl EventPayload {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, value: i64) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            value,
        }
    }
}
