//! Catalog cache configuration.

use serde::{Deserialize, Serialize};

/// In-memory catalog cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached entries.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Entry time-to-live in seconds.
    #[serde(default = "default_time_to_live")]
    pub time_to_live_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            time_to_live_seconds: default_time_to_live(),
        }
    }
}

fn default_max_capacity() -> u64 {
    1024
}

fn default_time_to_live() -> u64 {
    90
}
