//! Two-Factor Enrollment Use Case
//!
//! Two-step enrollment for an already-authenticated user:
//!
//! 1. `enroll` generates a fresh secret, persists it with 2FA still
//!    disabled, and returns the secret plus its provisioning URL.
//! 2. `confirm` checks a code from the user's authenticator against the
//!    stored secret and, on success, flips the enabled flag.
//!
//! Until `confirm` succeeds, login behavior is unchanged: a half-finished
//! enrollment must never lock anyone out.

use std::sync::Arc;

use crate::domain::directory::CredentialDirectory;
use crate::domain::value_object::user_name::UserName;
use crate::error::{AuthError, AuthResult};

/// Result of starting an enrollment
#[derive(Debug)]
pub struct EnrollmentOutput {
    /// Base32 secret for manual entry into an authenticator app
    pub secret_base32: String,
    /// otpauth:// URL for QR-style provisioning
    pub otpauth_url: String,
}

/// Two-factor enrollment service
#[derive(Clone)]
pub struct TwoFactorEnrollment<D> {
    directory: Arc<D>,
}

impl<D: CredentialDirectory> TwoFactorEnrollment<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Start (or restart) enrollment for an authenticated user.
    ///
    /// Re-enrollment replaces the previous secret and clears the enabled
    /// flag, so a lost authenticator can be swapped out by logging in with
    /// a password plus the old device while it still works.
    pub async fn enroll(&self, username: &UserName) -> AuthResult<EnrollmentOutput> {
        let mut credential = self
            .directory
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let secret = credential.enroll_totp();
        self.directory.save_totp_secret(username, &secret).await?;

        tracing::info!(username = %username.canonical(), "2FA enrollment started");
        Ok(EnrollmentOutput {
            secret_base32: secret.as_base32().to_string(),
            otpauth_url: secret.provisioning_url(username.canonical())?,
        })
    }

    /// Confirm enrollment with a code from the authenticator app.
    ///
    /// Only after this succeeds does login start demanding a code.
    pub async fn confirm(&self, username: &UserName, code: &str) -> AuthResult<()> {
        let credential = self
            .directory
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let secret = credential
            .totp_secret
            .as_ref()
            .ok_or(AuthError::TwoFactorNotEnrolled)?;

        if !secret.verify(code, username.canonical())? {
            tracing::debug!(username = %username.canonical(), "2FA confirmation failed");
            return Err(AuthError::TwoFactorInvalid);
        }

        self.directory.set_two_factor_enabled(username, true).await?;
        tracing::info!(username = %username.canonical(), "2FA enabled");
        Ok(())
    }

    /// Whether the account currently has confirmed, active 2FA.
    pub async fn is_enrolled(&self, username: &UserName) -> AuthResult<bool> {
        let credential = self
            .directory
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        Ok(credential.requires_two_factor())
    }
}
