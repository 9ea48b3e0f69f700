//! Typed client for event ingestion and balance lookup.

use reqwest::{Client, StatusCode};
use url::Url;

use super::ClientError;
use crate::AUTHORIZATION_SCHEME;
use crate::objects::{BalanceResponse, EventPayload, SubmitEventResponse};

/// Typed HTTP client for the revenue aggregator.
///
/// Event submission is authenticated with the shared secret sent as
/// `Authorization: Bearer <secret>`. Balance lookups are unauthenticated.
#[derive(Debug, Clone)]
pub struct RevenueClient {
    http: Client,
    base_url: Url,
    secret: String,
}

impl RevenueClient {
    /// Create a new `RevenueClient`.
    ///
    /// * `base_url` – root URL of the server (e.g. `http://127.0.0.1:8080`).
    /// * `secret` – the shared ingestion secret.
    pub fn new(base_url: Url, secret: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            secret: secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/events` – submit one event.
    ///
    /// Rejections the server explains with a structured body (unauthorized,
    /// malformed, storage failure) come back as
    /// [`SubmitEventResponse::Rejected`] rather than as an error, so callers
    /// can decide whether a retry makes sense.
    pub async fn submit_event(
        &self,
        payload: &EventPayload,
    ) -> Result<SubmitEventResponse, ClientError> {
        let resp = self
            .http
            .post(self.events_url()?)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{AUTHORIZATION_SCHEME} {}", self.secret),
            )
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        parse_submit_response(status, body)
    }

    /// `GET /api/v1/balances/{user_id}` – look up a balance.
    ///
    /// Returns `Ok(None)` when the user has never had a delta applied.
    pub async fn get_balance(&self, user_id: &str) -> Result<Option<BalanceResponse>, ClientError> {
        let resp = self.http.get(self.balance_url(user_id)?).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        parse_balance_response(status, body)
    }

    fn events_url(&self) -> Result<Url, ClientError> {
        Ok(self.base_url.join("/api/v1/events")?)
    }

    /// The user id is pushed as a single path segment, so `/` and other
    /// reserved characters are percent-encoded.
    fn balance_url(&self, user_id: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.join("/api/v1/balances/")?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(user_id);
        Ok(url)
    }
}

fn parse_submit_response(
    status: StatusCode,
    body: String,
) -> Result<SubmitEventResponse, ClientError> {
    match serde_json::from_str::<SubmitEventResponse>(&body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !status.is_success() => Err(ClientError::Api { status, body }),
        Err(e) => Err(ClientError::Json(e)),
    }
}

fn parse_balance_response(
    status: StatusCode,
    body: String,
) -> Result<Option<BalanceResponse>, ClientError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(ClientError::Api { status, body });
    }
    serde_json::from_str(&body).map(Some).map_err(ClientError::Json)
}
