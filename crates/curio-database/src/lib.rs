//! # curio-database
//!
//! Bounded asynchronous connection pool, parameterized query executor, and
//! the repositories built on top of them.

pub mod connection;
pub mod executor;
pub mod pool;
pub mod repositories;
pub mod schema;

pub use connection::SqliteFactory;
pub use executor::{QueryExecutor, QueryRequest, ResultRow, SqlParam, SqlValue};
pub use pool::{ConnectionFactory, Pool, PoolConfig, PoolGuard};
