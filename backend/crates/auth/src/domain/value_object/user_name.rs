//! User Name Value Object
//!
//! The username is the stable identity key for a credential record. Lookups
//! and token claims use the canonical (NFKC-normalized, lowercased) form so
//! that `Alice` and `alice` resolve to the same account; the original
//! spelling is kept for display only.
//!
//! ## Invariants
//! - 3 to 30 characters after normalization
//! - ASCII alphanumerics plus `_ . - +`
//! - Starts and ends with an alphanumeric or `_`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Minimum length for user name (in characters)
pub const USER_NAME_MIN_LENGTH: usize = 3;

/// Maximum length for user name (in characters)
pub const USER_NAME_MAX_LENGTH: usize = 30;

/// Allowed special characters in user name
const ALLOWED_SPECIAL_CHARS: &[char] = &['_', '.', '-', '+'];

/// Error returned when user name validation fails
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserNameError {
    #[error("User name cannot be empty")]
    Empty,

    #[error("User name must be at least {min} characters (got {length})")]
    TooShort { length: usize, min: usize },

    #[error("User name must be at most {max} characters (got {length})")]
    TooLong { length: usize, max: usize },

    #[error("User name contains invalid character '{char}'")]
    InvalidCharacter { char: char },

    #[error("User name must start and end with a letter, digit or '_'")]
    InvalidBoundary,
}

/// Validated user name with original and canonical forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserName {
    original: String,
    canonical: String,
}

impl UserName {
    /// Validate and normalize a raw user name.
    pub fn new(raw: &str) -> Result<Self, UserNameError> {
        let normalized: String = raw.nfkc().collect::<String>().trim().to_string();

        if normalized.is_empty() {
            return Err(UserNameError::Empty);
        }

        let length = normalized.chars().count();
        if length < USER_NAME_MIN_LENGTH {
            return Err(UserNameError::TooShort {
                length,
                min: USER_NAME_MIN_LENGTH,
            });
        }
        if length > USER_NAME_MAX_LENGTH {
            return Err(UserNameError::TooLong {
                length,
                max: USER_NAME_MAX_LENGTH,
            });
        }

        for ch in normalized.chars() {
            if !ch.is_ascii_alphanumeric() && !ALLOWED_SPECIAL_CHARS.contains(&ch) {
                return Err(UserNameError::InvalidCharacter { char: ch });
            }
        }

        let boundary_ok = |c: char| c.is_ascii_alphanumeric() || c == '_';
        let first = normalized.chars().next().unwrap_or(' ');
        let last = normalized.chars().last().unwrap_or(' ');
        if !boundary_ok(first) || !boundary_ok(last) {
            return Err(UserNameError::InvalidBoundary);
        }

        let canonical = normalized.to_ascii_lowercase();

        Ok(Self {
            original: normalized,
            canonical,
        })
    }

    /// Original spelling, for display.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Canonical form used as the lookup key and as the token subject.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
