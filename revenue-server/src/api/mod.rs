//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `POST /events`              – submit one event (bearer auth)
//! - `GET  /balances/{user_id}`  – look up a user's revenue

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use revenue_core::store::StorageError;
use revenue_sdk::objects::{Rejection, RejectionReason, SubmitEventResponse};

use crate::state::AppState;

mod balances;
mod events;
pub mod extractors;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(events::submit_event))
        .route("/balances/{user_id}", get(balances::get_balance))
}

/// Errors that can occur in API handlers.
#[derive(Debug)]
enum ApiError {
    /// The request body is not a valid event.
    Malformed(String),
    /// The balance store failed.
    Storage(StorageError),
    /// The requested balance does not exist.
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, rejection) = match self {
            ApiError::Malformed(message) => (
                StatusCode::BAD_REQUEST,
                Rejection::new(RejectionReason::Malformed, message),
            ),
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "API storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Rejection::new(RejectionReason::StorageFailure, "internal server error"),
                )
            }
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Rejection::new(RejectionReason::NotFound, "balance not found"),
            ),
        };
        (status, Json(SubmitEventResponse::Rejected(rejection))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::state::AppState;
    use argon2::{
        Algorithm, Argon2, Params, PasswordHasher, Version,
        password_hash::{SaltString, rand_core::OsRng},
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
    };
    use revenue_core::config::AuthConfig;
    use revenue_core::processors::AggregationEngine;
    use revenue_core::store::{Balance, BalanceStore, MemoryBalanceStore, StorageError};
    use revenue_core::strategies::StrategyRegistry;
    use revenue_sdk::client::RevenueClient;
    use revenue_sdk::objects::{
        Acceptance, BalanceResponse, EventPayload, RejectionReason, SubmitEventResponse,
    };
    use std::sync::Arc;
    use tower::ServiceExt;
    use url::Url;

    const SECRET: &str = "ingest-secret";

    /// Minimal-cost hash so tests don't spend seconds in argon2.
    fn test_auth() -> AuthConfig {
        let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap();
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(SECRET.as_bytes(), &salt)
            .unwrap()
            .to_string();
        AuthConfig::new(hash)
    }

    fn app_with(store: Arc<dyn BalanceStore>) -> Router {
        let engine = AggregationEngine::new(store, StrategyRegistry::with_defaults());
        build_router(AppState::new(engine, test_auth()))
    }

    fn app() -> Router {
        app_with(Arc::new(MemoryBalanceStore::new()))
    }

    struct DownStore;

    #[async_trait]
    impl BalanceStore for DownStore {
        async fn apply_delta(&self, _user_id: &str, _delta: i64) -> Result<i64, StorageError> {
            Err(StorageError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn get(&self, _user_id: &str) -> Result<Option<Balance>, StorageError> {
            Err(StorageError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn post_event(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/events")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    fn get_balance(user_id: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/api/v1/balances/{user_id}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn rejection_reason(body: SubmitEventResponse) -> RejectionReason {
        match body {
            SubmitEventResponse::Rejected(r) => r.reason,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let resp = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_submit_requires_token() {
        let resp = app()
            .oneshot(post_event(
                None,
                r#"{"userId":"u1","name":"add_revenue","value":10}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            rejection_reason(json(resp).await),
            RejectionReason::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_submit_rejects_wrong_token() {
        let resp = app()
            .oneshot(post_event(
                Some("wrong"),
                r#"{"userId":"u1","name":"add_revenue","value":10}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_submit_then_query_balance() {
        let app = app();

        let resp = app
            .clone()
            .oneshot(post_event(
                Some(SECRET),
                r#"{"userId":"u1","name":"add_revenue","value":98}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(
            json::<SubmitEventResponse>(resp).await,
            SubmitEventResponse::Accepted(Acceptance::applied("u1", 98))
        );

        let resp = app
            .clone()
            .oneshot(post_event(
                Some(SECRET),
                r#"{"userId":"u1","name":"subtract_revenue","value":72}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let resp = app.oneshot(get_balance("u1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let balance: BalanceResponse = json(resp).await;
        assert_eq!(balance.user_id, "u1");
        assert_eq!(balance.revenue, 26);
    }

    #[tokio::test]
    async fn test_submit_malformed_body() {
        let resp = app()
            .oneshot(post_event(Some(SECRET), "NOT JSON"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(rejection_reason(json(resp).await), RejectionReason::Malformed);
    }

    #[tokio::test]
    async fn test_submit_unhandled_kind_is_accepted() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(post_event(
                Some(SECRET),
                r#"{"userId":"u1","name":"refund","value":10}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(
            json::<SubmitEventResponse>(resp).await,
            SubmitEventResponse::Accepted(Acceptance::unhandled("refund"))
        );

        let resp = app.oneshot(get_balance("u1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_storage_failure() {
        let resp = app_with(Arc::new(DownStore))
            .oneshot(post_event(
                Some(SECRET),
                r#"{"userId":"u1","name":"add_revenue","value":10}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            rejection_reason(json(resp).await),
            RejectionReason::StorageFailure
        );
    }

    #[tokio::test]
    async fn test_unknown_balance_is_not_found() {
        let resp = app().oneshot(get_balance("nobody")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(rejection_reason(json(resp).await), RejectionReason::NotFound);
    }

    #[tokio::test]
    async fn test_sdk_client_against_running_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let client = RevenueClient::new(base.clone(), SECRET);

        let resp = client
            .submit_event(&EventPayload::new("team/a", "add_revenue", 40))
            .await
            .unwrap();
        assert_eq!(
            resp,
            SubmitEventResponse::Accepted(Acceptance::applied("team/a", 40))
        );

        let balance = client.get_balance("team/a").await.unwrap().unwrap();
        assert_eq!(balance.revenue, 40);
        assert!(client.get_balance("nobody").await.unwrap().is_none());

        let resp = RevenueClient::new(base, "wrong")
            .submit_event(&EventPayload::new("u1", "add_revenue", 1))
            .await
            .unwrap();
        assert!(matches!(
            resp,
            SubmitEventResponse::Rejected(r) if r.reason == RejectionReason::Unauthorized
        ));
    }
}
