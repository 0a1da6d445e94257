//! Request Gate Middleware
//!
//! Runs in front of every route. Resolves the caller's identity from the
//! `Authorization: Bearer` header, then enforces the [`RoutePolicy`] for
//! the request path.
//!
//! Identity resolution re-reads the credential directory on every request:
//! a token outlives deactivation, so claims alone are never enough. Roles
//! are also taken from the directory, not from the token, so a role change
//! takes effect immediately.
//!
//! A presented token must always be valid, even on public routes: a bad
//! token never downgrades the request to anonymous, it is a hard 401.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::application::token::TokenService;
use crate::domain::directory::CredentialDirectory;
use crate::domain::value_object::{role::Role, user_name::UserName};
use crate::error::AuthError;
use crate::presentation::policy::{Access, RoutePolicy};

/// Middleware state
#[derive(Clone)]
pub struct GateState<D>
where
    D: CredentialDirectory + Clone + Send + Sync + 'static,
{
    pub directory: Arc<D>,
    pub tokens: TokenService,
    pub policy: Arc<RoutePolicy>,
}

/// Resolved caller identity, stored in request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: UserName,
    pub roles: Vec<Role>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Policy-enforcing middleware for the whole application
pub async fn request_gate<D>(
    state: GateState<D>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response>
where
    D: CredentialDirectory + Clone + Send + Sync + 'static,
{
    let access = state.policy.access_for(req.method(), req.uri().path());
    let bearer = platform::bearer::extract_bearer(req.headers());

    let mut identity = None;
    if let Some(token) = bearer {
        let user = resolve_identity(&state, &token)
            .await
            .map_err(IntoResponse::into_response)?;
        identity = Some(user);
    }

    match access {
        Access::Public => {}
        Access::Authenticated | Access::Role(_) => {
            let Some(user) = &identity else {
                return Err(AuthError::AuthenticationRequired.into_response());
            };
            if let Access::Role(required) = access {
                if !user.has_role(required) {
                    tracing::debug!(
                        username = %user.username.canonical(),
                        required = %required,
                        "request rejected: missing role"
                    );
                    return Err(AuthError::InsufficientRole.into_response());
                }
            }
        }
    }

    if let Some(user) = identity {
        req.extensions_mut().insert(user);
    }

    Ok(next.run(req).await)
}

/// Validate the token, then re-resolve its subject in the directory.
async fn resolve_identity<D>(state: &GateState<D>, token: &str) -> Result<AuthenticatedUser, AuthError>
where
    D: CredentialDirectory + Clone + Send + Sync + 'static,
{
    let claims = state.tokens.validate(token)?;

    let username = UserName::new(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

    let credential = state
        .directory
        .find_by_username(&username)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    if !credential.can_login() {
        tracing::debug!(
            username = %username.canonical(),
            "token rejected: subject can no longer log in"
        );
        return Err(AuthError::InvalidToken);
    }

    Ok(AuthenticatedUser {
        username: credential.username,
        roles: credential.roles,
    })
}
