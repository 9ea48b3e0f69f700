//! Accept/reject bodies returned by the ingress endpoint.

use serde::{Deserialize, Serialize};

/// Response body of `POST /api/v1/events`.
///
/// Serialized with a `status` tag:
///
/// ```json
/// {"status": "accepted", "applied": true, "userId": "u1", "balance": 26}
/// {"status": "rejected", "reason": "malformed", "message": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmitEventResponse {
    Accepted(Acceptance),
    Rejected(Rejection),
}

/// An event the server took responsibility for.
///
/// `applied` is `false` when no strategy is bound to the event kind; the
/// event was still consumed and will not be retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acceptance {
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Balance after the delta was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unhandled_kind: Option<String>,
}

impl Acceptance {
    pub fn applied(user_id: impl Into<String>, balance: i64) -> Self {
        Self {
            applied: true,
            user_id: Some(user_id.into()),
            balance: Some(balance),
            unhandled_kind: None,
        }
    }

    pub fn unhandled(kind: impl Into<String>) -> Self {
        Self {
            applied: false,
            user_id: None,
            balance: None,
            unhandled_kind: Some(kind.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub message: String,
}

impl Rejection {
    pub fn new(reason: RejectionReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    Unauthorized,
    Malformed,
    StorageFailure,
    NotFound,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::Unauthorized => write!(f, "unauthorized"),
            RejectionReason::Malformed => write!(f, "malformed"),
            RejectionReason::StorageFailure => write!(f, "storage-failure"),
            RejectionReason::NotFound => write!(f, "not-found"),
        }
    }
}
