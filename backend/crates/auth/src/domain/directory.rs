//! Credential Directory Trait
//!
//! Interface to the external store of user credentials. Implementation is
//! in the infrastructure layer; tests use an in-memory implementation.
//!
//! Every call may fail or be slow; callers must fail closed on error.

use crate::domain::entity::credential::Credential;
use crate::domain::value_object::{totp_secret::TotpSecret, user_name::UserName};
use crate::error::AuthResult;

/// Credential directory trait
#[trait_variant::make(CredentialDirectory: Send)]
pub trait LocalCredentialDirectory {
    /// Find a credential record by username (canonical form)
    async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<Credential>>;

    /// Persist a newly enrolled TOTP secret, clearing the enabled flag
    async fn save_totp_secret(&self, username: &UserName, secret: &TotpSecret) -> AuthResult<()>;

    /// Flip the 2FA-enabled flag after a verified enrollment
    async fn set_two_factor_enabled(&self, username: &UserName, enabled: bool) -> AuthResult<()>;
}
