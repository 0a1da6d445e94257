//! Domain Layer
//!
//! Contains entities, value objects, and the Credential Directory trait.

pub mod directory;
pub mod entity;
pub mod value_object;

// Re-exports
pub use directory::CredentialDirectory;
pub use entity::credential::Credential;
