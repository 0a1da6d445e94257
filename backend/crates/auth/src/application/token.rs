//! Token Service
//!
//! Issues and validates stateless HS256 access tokens (compact JWS:
//! `base64url(header).base64url(claims).base64url(signature)`, unpadded).
//! Possession of a valid token is the only proof of authentication; the
//! server keeps no per-token state and issued tokens cannot be revoked
//! before expiry.
//!
//! Validation deliberately collapses every failure into one opaque
//! [`TokenError`]; the concrete reason is logged at debug level only.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::application::config::AuthConfig;
use crate::domain::value_object::role::Role;

type HmacSha256 = Hmac<Sha256>;

/// Fixed JOSE header for every issued token
const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Opaque validation failure.
///
/// Callers never learn whether the token was malformed, tampered with or
/// expired; a distinction would let an attacker probe the signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid token")]
pub struct TokenError;

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (canonical username)
    pub sub: String,
    /// Granted roles, snapshotted at issuance
    pub roles: Vec<Role>,
    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// Stateless token issuance and validation
#[derive(Clone)]
pub struct TokenService {
    config: Arc<AuthConfig>,
}

impl TokenService {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self { config }
    }

    /// Issue a signed token for an authenticated subject.
    ///
    /// Lifetime comes from [`AuthConfig::token_lifetime`]; `iat` is now.
    pub fn issue(&self, username: &str, roles: &[Role]) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            roles: roles.to_vec(),
            iat: now,
            exp: now + self.config.token_lifetime_secs(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> String {
        let header = URL_SAFE_NO_PAD.encode(JWT_HEADER.as_bytes());
        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(claims).expect("claims serialization is infallible"));
        let signing_input = format!("{header}.{payload}");

        let mut mac = HmacSha256::new_from_slice(&self.config.signing_key)
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{signing_input}.{signature}")
    }

    /// Validate a token and return its claims.
    ///
    /// Checks, in order: structure, signature, header algorithm, claims
    /// shape, expiry. The signature covers header and payload, so neither
    /// is trusted before the MAC verifies.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    fn validate_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            tracing::debug!("token rejected: not three segments");
            return Err(TokenError);
        };

        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| {
            tracing::debug!("token rejected: signature is not base64url");
            TokenError
        })?;

        let mut mac = HmacSha256::new_from_slice(&self.config.signing_key)
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        // Constant-time comparison
        mac.verify_slice(&signature).map_err(|_| {
            tracing::debug!("token rejected: signature mismatch");
            TokenError
        })?;

        let header_bytes = URL_SAFE_NO_PAD.decode(header_b64).map_err(|_| {
            tracing::debug!("token rejected: header is not base64url");
            TokenError
        })?;
        let header: Header = serde_json::from_slice(&header_bytes).map_err(|_| {
            tracing::debug!("token rejected: header is not valid JSON");
            TokenError
        })?;
        if header.alg != "HS256" {
            tracing::debug!(alg = %header.alg, "token rejected: unexpected algorithm");
            return Err(TokenError);
        }

        let payload_bytes = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| {
            tracing::debug!("token rejected: payload is not base64url");
            TokenError
        })?;
        let claims: Claims = serde_json::from_slice(&payload_bytes).map_err(|_| {
            tracing::debug!("token rejected: claims are not valid JSON");
            TokenError
        })?;

        // The expiry instant itself is already expired
        if now >= claims.exp {
            tracing::debug!(sub = %claims.sub, "token rejected: expired");
            return Err(TokenError);
        }

        Ok(claims)
    }
}
