//! Shared-secret authentication for event ingestion.

use argon2::{Argon2, PasswordHash, PasswordVerifier};

/// Ingestion auth configuration with the argon2-hashed shared secret.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_hash: String,
}

impl AuthConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Verify a presented bearer token against the stored hash.
    ///
    /// An unparseable stored hash verifies nothing.
    pub fn verify_secret(&self, token: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(token.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
