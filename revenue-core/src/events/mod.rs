//! Event records and how they enter the system.
//!
//! # Flow
//!
//! 1. An [`EventSource`] yields [`RawRecord`]s (one line of a replay log, or
//!    the body of one inbound request).
//! 2. [`EventDecoder`] turns each record into an [`Event`] or a
//!    [`DecodeError`] that carries the offending text.
//! 3. The aggregation engine routes the event to a strategy and applies the
//!    resulting delta to the balance store.
//!
//! Events are never persisted as-is; only their effect on the balance is.

pub mod decoder;
pub mod source;

pub use decoder::{DecodeError, EventDecoder};
pub use source::{EventSource, FileEventSource, SingleRecordSource, SourceError};

/// A decoded instruction to adjust one user's revenue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    /// Never empty.
    pub user_id: String,
    /// Kind tag used to pick a processing strategy.
    pub name: String,
    pub value: i64,
}

/// One undecoded record and its 1-based position in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub line: u64,
    pub text: String,
}

impl RawRecord {
    pub fn new(line: u64, text: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
        }
    }
}
