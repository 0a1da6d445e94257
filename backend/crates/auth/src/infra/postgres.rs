//! PostgreSQL Credential Directory
//!
//! Backed by two tables: `users` (one row per account, keyed by the
//! canonical username) and `user_roles` (one row per granted role).

use platform::password::HashedPassword;
use sqlx::PgPool;

use crate::domain::directory::CredentialDirectory;
use crate::domain::entity::credential::Credential;
use crate::domain::value_object::{
    role::Role, totp_secret::TotpSecret, user_name::UserName,
};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed credential directory
#[derive(Clone)]
pub struct PgCredentialDirectory {
    pool: PgPool,
}

impl PgCredentialDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CredentialDirectory for PgCredentialDirectory {
    async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<Credential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT
                u.user_name,
                u.password_hash,
                u.is_active,
                u.totp_secret,
                u.totp_enabled,
                array_remove(array_agg(r.role_code), NULL) AS role_codes
            FROM users u
            LEFT JOIN user_roles r ON r.user_name_canonical = u.user_name_canonical
            WHERE u.user_name_canonical = $1
            GROUP BY
                u.user_name,
                u.password_hash,
                u.is_active,
                u.totp_secret,
                u.totp_enabled
            "#,
        )
        .bind(username.canonical())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_credential()).transpose()
    }

    async fn save_totp_secret(&self, username: &UserName, secret: &TotpSecret) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET totp_secret = $2,
                totp_enabled = FALSE,
                updated_at = NOW()
            WHERE user_name_canonical = $1
            "#,
        )
        .bind(username.canonical())
        .bind(secret.as_base32())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(())
    }

    async fn set_two_factor_enabled(&self, username: &UserName, enabled: bool) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET totp_enabled = $2,
                updated_at = NOW()
            WHERE user_name_canonical = $1
              AND totp_secret IS NOT NULL
            "#,
        )
        .bind(username.canonical())
        .bind(enabled)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::TwoFactorNotEnrolled);
        }

        Ok(())
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_name: String,
    password_hash: String,
    is_active: bool,
    totp_secret: Option<String>,
    totp_enabled: bool,
    role_codes: Vec<String>,
}

impl CredentialRow {
    fn into_credential(self) -> AuthResult<Credential> {
        let username = UserName::new(&self.user_name)
            .map_err(|e| AuthError::Internal(format!("Invalid stored user_name: {}", e)))?;

        let password_hash = HashedPassword::from_phc_string(self.password_hash)
            .map_err(|_| AuthError::Internal("Invalid stored password hash".to_string()))?;

        // Unknown role codes are dropped rather than failing the login;
        // an account left with no roles cannot log in at all.
        let roles: Vec<Role> = self
            .role_codes
            .iter()
            .filter_map(|code| Role::from_code(code))
            .collect();

        let totp_secret = self
            .totp_secret
            .map(TotpSecret::from_base32)
            .transpose()
            .map_err(|e| AuthError::Internal(format!("Invalid stored TOTP secret: {}", e)))?;

        Ok(Credential {
            username,
            password_hash,
            roles,
            is_active: self.is_active,
            totp_secret,
            two_factor_enabled: self.totp_enabled,
        })
    }
}
