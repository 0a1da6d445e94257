//! Application Layer
//!
//! Use cases and application services.

pub mod authenticate;
pub mod config;
pub mod token;
pub mod two_factor;

// Re-exports
pub use authenticate::{AuthenticateInput, AuthenticateUseCase};
pub use config::AuthConfig;
pub use token::{Claims, TokenError, TokenService};
pub use two_factor::{EnrollmentOutput, TwoFactorEnrollment};
