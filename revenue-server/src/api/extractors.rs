//! Custom Axum extractors for request authentication.
//!
//! Provides `BearerAuth`, which checks the `Authorization: Bearer <secret>`
//! header against the argon2-hashed shared secret (used by event ingestion).

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use revenue_sdk::AUTHORIZATION_SCHEME;
use revenue_sdk::objects::{Rejection, RejectionReason, SubmitEventResponse};

use crate::state::AppState;

/// An Axum extractor that only succeeds when the request carries the
/// shared ingestion secret.
///
/// # Header format
///
/// ```text
/// Authorization: Bearer {secret}
/// ```
pub struct BearerAuth;

/// Errors returned by the [`BearerAuth`] extractor.
#[derive(Debug, thiserror::Error)]
pub enum BearerAuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("invalid Authorization header format")]
    InvalidHeader,
    #[error("invalid bearer token")]
    InvalidToken,
}

impl IntoResponse for BearerAuthError {
    fn into_response(self) -> Response {
        let body = SubmitEventResponse::Rejected(Rejection::new(
            RejectionReason::Unauthorized,
            self.to_string(),
        ));
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Split `Bearer <token>` into the token. The scheme is case-insensitive.
fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(AUTHORIZATION_SCHEME) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for BearerAuth {
    type Rejection = BearerAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(BearerAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| BearerAuthError::InvalidHeader)?;

        let token = parse_bearer(header_value)
            .ok_or(BearerAuthError::InvalidHeader)?
            .to_owned();

        // argon2 verification blocks for milliseconds; run it on the blocking pool.
        let auth = state.auth.clone();
        let verified = tokio::task::spawn_blocking(move || auth.verify_secret(&token))
            .await
            .unwrap_or(false);

        if verified {
            Ok(BearerAuth)
        } else {
            tracing::warn!("Rejected event submission with invalid bearer token");
            Err(BearerAuthError::InvalidToken)
        }
    }
}
