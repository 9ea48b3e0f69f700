use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use revenue_sdk::objects::BalanceResponse;

use super::ApiError;
use crate::state::AppState;

/// `GET /balances/{user_id}` — look up one user's revenue.
///
/// A user with no applied events is `404`, never a zero balance.
pub(super) async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state
        .engine
        .balance(&user_id)
        .await
        .map_err(ApiError::Storage)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(BalanceResponse {
        user_id: balance.user_id,
        revenue: balance.revenue,
        updated_at: balance.updated_at.assume_utc().unix_timestamp(),
    }))
}
