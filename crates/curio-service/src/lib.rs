//! # curio-service
//!
//! The catalog service (repository plus read-through cache) and the
//! dispatcher that routes parsed protocol requests through authentication
//! into the catalog.

pub mod catalog;
pub mod dispatch;

pub use catalog::CatalogService;
pub use dispatch::Dispatcher;
