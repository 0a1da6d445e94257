//! Entity Module

pub mod credential;

pub use credential::Credential;
