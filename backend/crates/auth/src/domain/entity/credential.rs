//! Credential Entity
//!
//! One record from the Credential Directory: everything the core needs to
//! decide a login and to authorize requests. Read-mostly; the only writes
//! the core performs are the two-factor enrollment fields.

use platform::password::HashedPassword;

use crate::domain::value_object::{role::Role, totp_secret::TotpSecret, user_name::UserName};

/// Credential record
///
/// The password hash is opaque to this entity; verification goes through
/// `platform::password`. The hash is never serialized or logged.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Unique, stable identity key
    pub username: UserName,
    /// Argon2id hash in PHC format
    pub password_hash: HashedPassword,
    /// Role set; any usable account has at least one role
    pub roles: Vec<Role>,
    /// Inactive accounts never authenticate
    pub is_active: bool,
    /// TOTP shared secret, present once 2FA has been enrolled
    pub totp_secret: Option<TotpSecret>,
    /// Whether a 2FA code is required at login
    pub two_factor_enabled: bool,
}

impl Credential {
    pub fn new(username: UserName, password_hash: HashedPassword, roles: Vec<Role>) -> Self {
        Self {
            username,
            password_hash,
            roles,
            is_active: true,
            totp_secret: None,
            two_factor_enabled: false,
        }
    }

    /// Whether this account may authenticate at all.
    pub fn can_login(&self) -> bool {
        self.is_active && !self.roles.is_empty()
    }

    /// Whether login must be gated by a TOTP code.
    ///
    /// Enrollment alone does not gate login; the flag is only set after the
    /// user has proven possession of a working authenticator.
    pub fn requires_two_factor(&self) -> bool {
        self.two_factor_enabled && self.totp_secret.is_some()
    }

    /// Begin two-factor enrollment: store a fresh secret, not yet enabled.
    /// Re-enrollment replaces any previous unconfirmed secret.
    pub fn enroll_totp(&mut self) -> TotpSecret {
        let secret = TotpSecret::generate();
        self.totp_secret = Some(secret.clone());
        self.two_factor_enabled = false;
        secret
    }

    /// Enable 2FA after the user verified a code against the stored secret.
    pub fn enable_two_factor(&mut self) {
        if self.totp_secret.is_some() {
            self.two_factor_enabled = true;
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
