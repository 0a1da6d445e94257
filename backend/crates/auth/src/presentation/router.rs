//! Auth Router

use axum::{Router, routing::post};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::token::TokenService;
use crate::domain::directory::CredentialDirectory;
use crate::infra::postgres::PgCredentialDirectory;
use crate::presentation::handlers::{self, AuthAppState};

/// Create the Auth router with the PostgreSQL directory
pub fn auth_router(
    directory: PgCredentialDirectory,
    tokens: TokenService,
    config: Arc<AuthConfig>,
) -> Router {
    auth_router_generic(directory, tokens, config)
}

/// Create a generic Auth router for any directory implementation
pub fn auth_router_generic<D>(directory: D, tokens: TokenService, config: Arc<AuthConfig>) -> Router
where
    D: CredentialDirectory + Clone + Send + Sync + 'static,
{
    let state = AuthAppState {
        directory: Arc::new(directory),
        tokens,
        config,
    };

    Router::new()
        .route("/authenticate", post(handlers::authenticate::<D>))
        .route("/setup-2fa", post(handlers::setup_two_factor::<D>))
        .route("/verify-2fa", post(handlers::verify_two_factor::<D>))
        .with_state(state)
}
