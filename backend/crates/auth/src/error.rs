//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.
//!
//! Client-facing collapse rules: unknown user, wrong password and inactive
//! account all surface as `InvalidCredentials`; malformed, tampered and
//! expired tokens all surface as `InvalidToken`. The precise reason is only
//! ever logged server-side.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong password or inactive account
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Password was correct but the account requires a 2FA code
    #[error("Two-factor code required")]
    TwoFactorRequired,

    /// A 2FA code was supplied but did not verify
    #[error("Invalid two-factor code")]
    TwoFactorInvalid,

    /// 2FA operation on an account that never enrolled
    #[error("Two-factor authentication is not set up")]
    TwoFactorNotEnrolled,

    /// A token was presented but is malformed, tampered or expired
    #[error("Invalid or expired token")]
    InvalidToken,

    /// A protected route was requested without any token
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Authenticated, but the route requires a role the identity lacks
    #[error("Insufficient permissions")]
    InsufficientRole,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TwoFactorRequired
            | AuthError::TwoFactorInvalid
            | AuthError::InvalidToken
            | AuthError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::TwoFactorNotEnrolled => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TwoFactorRequired
            | AuthError::TwoFactorInvalid
            | AuthError::InvalidToken
            | AuthError::AuthenticationRequired => ErrorKind::Unauthorized,
            AuthError::InsufficientRole => ErrorKind::Forbidden,
            AuthError::TwoFactorNotEnrolled => ErrorKind::UnprocessableEntity,
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError. Server faults get a generic client message;
    /// the detail stays in the log.
    pub fn to_app_error(&self) -> AppError {
        if self.kind().is_server_error() {
            AppError::new(self.kind(), "Internal server error")
        } else {
            AppError::new(self.kind(), self.to_string())
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::InvalidToken => {
                tracing::warn!("Rejected request with invalid token");
            }
            AuthError::InsufficientRole => {
                tracing::warn!("Rejected request lacking required role");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<crate::application::token::TokenError> for AuthError {
    fn from(_: crate::application::token::TokenError) -> Self {
        AuthError::InvalidToken
    }
}
