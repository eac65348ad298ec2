//! Schema bootstrap for the embedded SQLite database.
//!
//! Identifiers and timestamps are stored as TEXT so rows decode through the
//! dynamic [`ResultRow`](crate::executor::ResultRow) surface without driver
//! type extensions. Callers parse them back at the repository layer.

use curio_core::error::QueryError;
use tracing::info;

use crate::executor::{QueryExecutor, QueryRequest};

const CREATE_USERS: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    hash_version  INTEGER NOT NULL,
    created_at    TEXT NOT NULL
)";

const CREATE_COLLECTIBLES: &str = "\
CREATE TABLE IF NOT EXISTS collectibles (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    category    TEXT NOT NULL,
    price       REAL NOT NULL,
    released_on TEXT NOT NULL
)";

/// Creates all application tables if they do not already exist.
pub async fn ensure_schema(executor: &QueryExecutor) -> Result<(), QueryError> {
    executor.execute(&QueryRequest::new(CREATE_USERS)).await?;
    executor.execute(&QueryRequest::new(CREATE_COLLECTIBLES)).await?;
    info!("database schema is up to date");
    Ok(())
}
