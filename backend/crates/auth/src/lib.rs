//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, the Credential Directory trait
//! - `application/` - Use cases: authenticate, token service, 2FA enrollment
//! - `infra/` - Database implementations
//! - `presentation/` - HTTP handlers, DTOs, router, request gate
//!
//! ## Features
//! - Password login issuing stateless, signed access tokens (JWT, HS256)
//! - TOTP-based 2FA (Google Authenticator compatible)
//! - Per-request token validation with a declarative route-to-role policy
//!
//! ## Security Model
//! - Passwords verified against Argon2id hashes; hashes never leave the core
//! - Tokens carry subject, roles and expiry; nothing is stored server-side
//! - Unknown user, wrong password and inactive account are indistinguishable
//!   to the client
//! - 2FA gates login only; it never gates token validation on later requests

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use application::token::{Claims, TokenService};
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgCredentialDirectory;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
    pub use crate::presentation::policy::*;
}
