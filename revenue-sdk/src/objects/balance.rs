use serde::{Deserialize, Serialize};

/// Response returned by `GET /api/v1/balances/{user_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user_id: String,
    /// Sum of every delta applied to this user.
    pub revenue: i64,
    /// Unix timestamp of the last applied delta.
    pub updated_at: i64,
}
