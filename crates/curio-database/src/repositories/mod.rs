//! Typed data access built on top of the dynamic query executor.

pub mod collectible;
pub mod credential;

pub use collectible::CollectibleRepository;
pub use credential::CredentialRepository;
