//! # curio-core
//!
//! Core crate for Curio. Contains configuration schemas, the typed error
//! taxonomy, the injectable clock, domain entities, and the wire protocol
//! types.
//!
//! This crate has **no** internal dependencies on other Curio crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::AppConfig;
