//! # curio-auth
//!
//! Credential hashing (Argon2id), session token issuance and validation
//! (HS256), and the login orchestrator that ties them to the credential
//! store.

pub mod password;
pub mod service;
pub mod token;

pub use password::CredentialHasher;
pub use service::AuthService;
pub use token::{Claims, IssuedToken, TokenService};
