//! Value Object Module

pub mod role;
pub mod totp_secret;
pub mod user_name;

// Re-exports
pub use role::Role;
pub use totp_secret::TotpSecret;
pub use user_name::UserName;
