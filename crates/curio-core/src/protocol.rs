//! Wire protocol: parsed request and response types.
//!
//! The transport (newline-delimited JSON over TCP) delivers a parsed
//! [`Request`] to the dispatcher and carries back a [`Response`]. This is
//! the entire contract between the routing layer and the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Category, Collectible};

/// A parsed client request: an operation plus an optional bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// The requested operation.
    #[serde(flatten)]
    pub op: Operation,
    /// Bearer token. Required for every operation except `login`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// The operation kinds a client can request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "body", rename_all = "snake_case")]
pub enum Operation {
    /// Establish identity and receive a session token.
    Login { username: String, password: String },
    /// Exchange a still-valid token for a fresh one.
    Refresh,
    /// Replace the caller's password.
    ChangePassword {
        old_password: String,
        new_password: String,
    },
    /// List the whole catalog.
    ListAll,
    /// Fetch a single collectible.
    GetById { id: Uuid },
    /// List collectibles in one product line.
    ListByCategory { category: Category },
    /// List collectibles released in a given year.
    ListByYear { year: i32 },
    /// Add a collectible.
    Create { item: Collectible },
    /// Replace a collectible.
    Update { item: Collectible },
    /// Remove a collectible.
    Delete { id: Uuid },
}

/// Server responses, tagged by status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// Successful operation with a JSON payload.
    Ok { content: serde_json::Value },
    /// Successful login or refresh.
    Token {
        token: String,
        expires_at: DateTime<Utc>,
    },
    /// Missing, rejected, or expired credentials.
    Unauthorized { message: String },
    /// Any other failure, already sanitized for the client.
    Error { message: String },
}

impl Response {
    /// A success response wrapping any serializable payload.
    pub fn ok<T: Serialize>(content: &T) -> Self {
        match serde_json::to_value(content) {
            Ok(value) => Self::Ok { content: value },
            Err(e) => Self::Error {
                message: format!("failed to encode response: {e}"),
            },
        }
    }

    /// An unauthorized response.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// A generic error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
