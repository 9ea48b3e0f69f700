use axum::{Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use revenue_core::events::SingleRecordSource;
use revenue_core::processors::{EventOutcome, LiveRejection};
use revenue_sdk::objects::{Acceptance, SubmitEventResponse};

use super::ApiError;
use crate::api::extractors::BearerAuth;
use crate::state::AppState;

/// `POST /events` — submit one event.
///
/// The body is a single JSON event. Responds `202 Accepted` once the delta
/// has been applied, or when the event kind has no strategy bound (in which
/// case `applied` is `false`).
pub(super) async fn submit_event(
    State(state): State<AppState>,
    _auth: BearerAuth,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let raw = String::from_utf8(body.to_vec())
        .map_err(|_| ApiError::Malformed("request body is not valid UTF-8".to_string()))?;

    let outcome = state
        .engine
        .submit(SingleRecordSource::new(raw))
        .await
        .map_err(|rejection| match rejection {
            LiveRejection::Malformed(e) => ApiError::Malformed(e.to_string()),
            LiveRejection::Empty => ApiError::Malformed("request body is empty".to_string()),
            LiveRejection::Source(e) => ApiError::Malformed(e.to_string()),
            LiveRejection::Storage(e) => ApiError::Storage(e),
        })?;

    let acceptance = match outcome {
        EventOutcome::Applied {
            user_id, balance, ..
        } => Acceptance::applied(user_id, balance),
        EventOutcome::Unhandled { kind } => Acceptance::unhandled(kind),
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitEventResponse::Accepted(acceptance)),
    ))
}
