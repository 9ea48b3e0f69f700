//! Raw record to [`Event`] decoding.

use super::Event;
use revenue_sdk::objects::EventPayload;
use thiserror::Error;

/// A record that could not be turned into an [`Event`].
///
/// Always carries the offending raw text so callers can log it.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JSON, missing a field, or a field of the wrong type
    /// (including a non-integer `value`).
    #[error("invalid event record: {source}")]
    Json {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("event record has an empty userId")]
    EmptyUserId { raw: String },

    /// `i64::MIN` has no negation, so it could not be debited exactly.
    #[error("event value {value} is out of range")]
    ValueOutOfRange { raw: String, value: i64 },
}

impl DecodeError {
    /// The text that failed to decode.
    pub fn raw(&self) -> &str {
        match self {
            DecodeError::Json { raw, .. } => raw,
            DecodeError::EmptyUserId { raw } => raw,
            DecodeError::ValueOutOfRange { raw, .. } => raw,
        }
    }
}

/// Stateless decoder for the line-delimited JSON event format.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDecoder;

impl EventDecoder {
    /// Decode one record. Total: every input maps to an `Event` or a
    /// `DecodeError`.
    pub fn decode(&self, raw: &str) -> Result<Event, DecodeError> {
        let payload: EventPayload =
            serde_json::from_str(raw).map_err(|source| DecodeError::Json {
                raw: raw.to_owned(),
                source,
            })?;

        if payload.user_id.trim().is_empty() {
            return Err(DecodeError::EmptyUserId {
                raw: raw.to_owned(),
            });
        }

        if payload.value == i64::MIN {
            return Err(DecodeError::ValueOutOfRange {
                raw: raw.to_owned(),
                value: payload.value,
            });
        }

        Ok(Event {
            user_id: payload.user_id,
            name: payload.name,
            value: payload.value,
        })
    }
}
