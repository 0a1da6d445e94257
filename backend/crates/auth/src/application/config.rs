//! Application Configuration
//!
//! Configuration for the Auth application layer. Constructed once at
//! startup and passed to every component behind an `Arc`; the signing key
//! is read-only after that point, so no synchronization is needed.

use std::time::Duration;

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 signing key for access tokens (32 bytes)
    pub signing_key: [u8; 32],
    /// Access token lifetime (1 hour)
    pub token_lifetime: Duration,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_key: [0u8; 32],
            token_lifetime: Duration::from_secs(3600),
            password_pepper: None,
        }
    }
}

impl AuthConfig {
    /// Create config with a random signing key.
    ///
    /// Tokens die with the process; fine for development and tests, wrong
    /// for any deployment with more than one instance.
    pub fn with_random_key() -> Self {
        use rand::RngCore;
        let mut key = [0u8; 32];
        rand::rng().fill_bytes(&mut key);
        Self {
            signing_key: key,
            ..Default::default()
        }
    }

    /// Create config for development
    pub fn development() -> Self {
        Self::with_random_key()
    }

    /// Token lifetime in whole seconds
    pub fn token_lifetime_secs(&self) -> i64 {
        self.token_lifetime.as_secs() as i64
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}
