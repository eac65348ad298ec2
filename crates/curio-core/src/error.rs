//! Typed error taxonomy shared across the Curio crates.
//!
//! Each layer exposes its own enum and callers match exhaustively. An error
//! crossing a crate boundary is always one of these kinds, never an opaque
//! driver or library error.

use thiserror::Error;

/// Configuration loading or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration sources could not be read or merged.
    #[error("failed to load configuration: {0}")]
    Load(String),
    /// The merged configuration carries an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        Self::Load(err.to_string())
    }
}

/// Connection pool failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No connection became available within the acquire timeout.
    #[error("connection pool exhausted")]
    Exhausted,
    /// The pool has been shut down; no further leases are handed out.
    #[error("connection pool is closed")]
    Closed,
    /// Opening a new connection failed.
    #[error("failed to open connection: {0}")]
    Connect(String),
}

/// Query execution failures surfaced by the executor.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A uniqueness or other relational constraint was violated.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// The connection dropped mid-statement. The executor retries this once
    /// on a freshly acquired connection before surfacing it.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// The statement exceeded the configured statement timeout.
    #[error("statement timed out")]
    Timeout,
    /// Malformed statement or a missing relation/column. Programmer error,
    /// never retried.
    #[error("syntax or schema error: {0}")]
    SyntaxOrSchema(String),
    /// A row came back in a shape the caller could not decode.
    #[error("failed to decode row: {0}")]
    Decode(String),
    /// Acquiring a pooled connection failed.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Credential hashing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// The stored hash is not a parseable PHC string.
    #[error("stored password hash is malformed")]
    Malformed,
    /// The digest primitive failed while producing a new hash.
    #[error("password digest failed: {0}")]
    Digest(String),
}

/// Session token failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token was valid once but its expiry has passed.
    #[error("token has expired")]
    Expired,
    /// The signature does not match the claimed payload.
    #[error("token signature is invalid")]
    InvalidSignature,
    /// The token is not structurally a signed token at all.
    #[error("token is malformed")]
    Malformed,
}

/// Failures surfaced by the auth orchestrator.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user or wrong password. Deliberately a single variant with a
    /// single message so the two cases are indistinguishable to callers.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Query(#[from] QueryError),
    /// Runtime failure outside the taxonomy, e.g. a crashed blocking task.
    #[error("internal auth failure: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_message_is_uniform() {
        // Both login failure paths reuse this one variant, so the message
        // must not mention which part of the credential was wrong.
        let msg = AuthError::InvalidCredentials.to_string();
        assert!(!msg.contains("user not found"));
        assert!(!msg.contains("wrong password"));
        assert_eq!(msg, "invalid username or password");
    }

    #[test]
    fn test_pool_error_propagates_through_query_error() {
        let err = QueryError::from(PoolError::Exhausted);
        assert_eq!(err.to_string(), "connection pool exhausted");
    }
}
