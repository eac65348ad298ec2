//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Credential hashing and token issuance configuration.
///
/// Hash cost and token TTL are deliberately configuration rather than
/// constants so production and test environments can tune them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for token signing (HMAC-SHA256). Server-held only.
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
    /// Session token TTL in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
    /// Argon2id memory cost in KiB.
    #[serde(default = "default_hash_memory")]
    pub hash_memory_kib: u32,
    /// Argon2id iteration count.
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
    /// Argon2id lane count.
    #[serde(default = "default_hash_parallelism")]
    pub hash_parallelism: u32,
    /// Username seeded at startup when the credential table is empty.
    #[serde(default)]
    pub bootstrap_username: Option<String>,
    /// Password for the seeded user. Ignored unless the username is set.
    #[serde(default)]
    pub bootstrap_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            token_ttl_seconds: default_token_ttl(),
            hash_memory_kib: default_hash_memory(),
            hash_iterations: default_hash_iterations(),
            hash_parallelism: default_hash_parallelism(),
            bootstrap_username: None,
            bootstrap_password: None,
        }
    }
}

fn default_token_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_token_ttl() -> u64 {
    900
}

fn default_hash_memory() -> u32 {
    19456
}

fn default_hash_iterations() -> u32 {
    2
}

fn default_hash_parallelism() -> u32 {
    1
}
