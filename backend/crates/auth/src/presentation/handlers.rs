//! HTTP Handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::{AuthenticateInput, AuthenticateUseCase, TokenService, TwoFactorEnrollment};
use crate::domain::directory::CredentialDirectory;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AuthenticateRequest, AuthenticateResponse, TwoFactorSetupResponse, TwoFactorVerifyRequest,
};
use crate::presentation::middleware::AuthenticatedUser;

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthAppState<D>
where
    D: CredentialDirectory + Clone + Send + Sync + 'static,
{
    pub directory: Arc<D>,
    pub tokens: TokenService,
    pub config: Arc<AuthConfig>,
}

// ============================================================================
// Authenticate
// ============================================================================

/// POST /authenticate
pub async fn authenticate<D>(
    State(state): State<AuthAppState<D>>,
    Json(req): Json<AuthenticateRequest>,
) -> AuthResult<Json<AuthenticateResponse>>
where
    D: CredentialDirectory + Clone + Send + Sync + 'static,
{
    let use_case = AuthenticateUseCase::new(
        state.directory.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let jwt = use_case
        .execute(AuthenticateInput {
            username: req.username,
            password: req.password,
            two_factor_code: req.two_factor_token,
        })
        .await?;

    Ok(Json(AuthenticateResponse { jwt }))
}

// ============================================================================
// Two-Factor Enrollment
// ============================================================================

/// POST /setup-2fa
pub async fn setup_two_factor<D>(
    State(state): State<AuthAppState<D>>,
    user: Option<Extension<AuthenticatedUser>>,
) -> AuthResult<Json<TwoFactorSetupResponse>>
where
    D: CredentialDirectory + Clone + Send + Sync + 'static,
{
    let Some(Extension(user)) = user else {
        return Err(AuthError::AuthenticationRequired);
    };

    let enrollment = TwoFactorEnrollment::new(state.directory.clone());
    let output = enrollment.enroll(&user.username).await?;

    Ok(Json(TwoFactorSetupResponse {
        secret: output.secret_base32,
        otpauth_url: output.otpauth_url,
    }))
}

/// POST /verify-2fa
pub async fn verify_two_factor<D>(
    State(state): State<AuthAppState<D>>,
    user: Option<Extension<AuthenticatedUser>>,
    Json(req): Json<TwoFactorVerifyRequest>,
) -> AuthResult<StatusCode>
where
    D: CredentialDirectory + Clone + Send + Sync + 'static,
{
    let Some(Extension(user)) = user else {
        return Err(AuthError::AuthenticationRequired);
    };

    let enrollment = TwoFactorEnrollment::new(state.directory.clone());
    enrollment.confirm(&user.username, &req.token).await?;

    Ok(StatusCode::NO_CONTENT)
}
