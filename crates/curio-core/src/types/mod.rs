//! Domain entities.

pub mod collectible;
pub mod credential;

pub use collectible::{Category, Collectible};
pub use credential::{Credential, CURRENT_HASH_VERSION};
