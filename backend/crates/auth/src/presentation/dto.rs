//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

// ============================================================================
// Authenticate
// ============================================================================

/// Login request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    pub username: String,
    pub password: String,
    /// TOTP code, required once the account has 2FA enabled
    pub two_factor_token: Option<String>,
}

/// Login response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    /// Signed access token; send as `Authorization: Bearer <jwt>`
    pub jwt: String,
}

// ============================================================================
// Two-Factor Enrollment
// ============================================================================

/// 2FA setup response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetupResponse {
    /// Base32 secret for manual entry
    pub secret: String,
    /// otpauth:// URL for authenticator apps
    pub otpauth_url: String,
}

/// 2FA verify request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorVerifyRequest {
    pub token: String,
}
