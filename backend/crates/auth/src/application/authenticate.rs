//! Authenticate Use Case
//!
//! The login decision: password check, optional TOTP gate, token issuance.
//!
//! Every credential failure collapses into [`AuthError::InvalidCredentials`]
//! so a caller cannot distinguish "no such user" from "wrong password" from
//! "inactive account". That holds for timing too, not just the response: a
//! lookup miss pays one Argon2 verification against a dummy hash so that an
//! unknown username costs the same as a wrong password. Only the two-factor
//! outcomes are distinguishable, because the client needs to know whether to
//! prompt for a code.

use std::sync::{Arc, LazyLock};

use platform::password::{ClearTextPassword, HashedPassword};

use crate::application::config::AuthConfig;
use crate::application::token::TokenService;
use crate::domain::directory::CredentialDirectory;
use crate::domain::value_object::user_name::UserName;
use crate::error::{AuthError, AuthResult};

/// Stand-in hash for accounts that do not exist. Hashed with the same
/// default parameters as real credentials so verification costs the same.
static DUMMY_HASH: LazyLock<HashedPassword> = LazyLock::new(|| {
    ClearTextPassword::new("timing-equalizer-dummy-1".to_string())
        .expect("dummy password passes policy")
        .hash(None)
        .expect("hashing a fixed password cannot fail")
});

/// Login request input
#[derive(Debug)]
pub struct AuthenticateInput {
    pub username: String,
    pub password: String,
    /// Six-digit TOTP code, required only for 2FA-enabled accounts
    pub two_factor_code: Option<String>,
}

/// Authenticate use case
#[derive(Clone)]
pub struct AuthenticateUseCase<D> {
    directory: Arc<D>,
    tokens: TokenService,
    config: Arc<AuthConfig>,
}

impl<D: CredentialDirectory> AuthenticateUseCase<D> {
    pub fn new(directory: Arc<D>, tokens: TokenService, config: Arc<AuthConfig>) -> Self {
        Self {
            directory,
            tokens,
            config,
        }
    }

    /// Run the login state machine and return a signed access token.
    pub async fn execute(&self, input: AuthenticateInput) -> AuthResult<String> {
        // A username that fails normalization cannot name any account
        let username = UserName::new(&input.username).map_err(|_| {
            tracing::debug!("login rejected: unparseable username");
            AuthError::InvalidCredentials
        })?;

        let password = ClearTextPassword::new(input.password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let credential = self.directory.find_by_username(&username).await?;

        // Always pay exactly one hash verification, hit or miss, so latency
        // cannot reveal whether the username exists
        let password_ok = match &credential {
            Some(cred) => cred.password_hash.verify(&password, self.config.pepper()),
            None => {
                let _ = DUMMY_HASH.verify(&password, self.config.pepper());
                false
            }
        };

        let Some(credential) = credential else {
            tracing::debug!(username = %username.canonical(), "login rejected: unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        if !credential.can_login() {
            tracing::debug!(username = %username.canonical(), "login rejected: account unusable");
            return Err(AuthError::InvalidCredentials);
        }

        if !password_ok {
            tracing::debug!(username = %username.canonical(), "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        // Password is proven; now the optional second factor
        if credential.requires_two_factor() {
            let secret = credential
                .totp_secret
                .as_ref()
                .ok_or(AuthError::InvalidCredentials)?;
            match input.two_factor_code.as_deref() {
                None | Some("") => {
                    tracing::debug!(username = %username.canonical(), "login pending: 2FA code required");
                    return Err(AuthError::TwoFactorRequired);
                }
                Some(code) => {
                    if !secret.verify(code, username.canonical())? {
                        tracing::debug!(username = %username.canonical(), "login rejected: bad 2FA code");
                        return Err(AuthError::TwoFactorInvalid);
                    }
                }
            }
        }

        tracing::info!(username = %username.canonical(), "login succeeded");
        Ok(self
            .tokens
            .issue(credential.username.canonical(), &credential.roles))
    }
}
