//! Platform - security primitives shared across backend domains
//!
//! - `password`: Argon2id hashing and verification with zeroized cleartext
//! - `bearer`: Authorization header token extraction

pub mod bearer;
pub mod password;
