//! Stored credential entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored login credential.
///
/// Immutable once written; a password change replaces the hash wholesale
/// in a single update. The hash is an opaque self-describing PHC string
/// and is never serialized outward or logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Unique user identifier.
    pub user_id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Argon2id PHC string (cost params + salt + digest, self-describing).
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Version of the hashing scheme, for future algorithm migrations.
    pub hash_version: i64,
    /// When the credential was created.
    pub created_at: DateTime<Utc>,
}

/// The hashing scheme version written for newly stored credentials.
pub const CURRENT_HASH_VERSION: i64 = 1;
