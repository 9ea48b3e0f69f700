//! Wire types and HTTP client for the revenue aggregator.
//!
//! The [`objects`] module is always available and is shared with the server.
//! The [`client`] module is gated behind the `client` feature.

#![forbid(unsafe_code)]

pub mod objects;

#[cfg(feature = "client")]
pub mod client;

/// Scheme prefix of the `Authorization` header on ingress requests.
pub const AUTHORIZATION_SCHEME: &str = "Bearer";
