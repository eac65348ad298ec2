//! Database and connection pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection pool and statement execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://data/curio.db`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Number of idle connections opened eagerly at startup.
    #[serde(default = "default_min_idle")]
    pub min_idle: u32,
    /// Hard upper bound on connections the pool will ever hold.
    #[serde(default = "default_max_total")]
    pub max_total: u32,
    /// How long an acquire waits for a lease before giving up.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    /// Idle connections older than this are pinged before reuse.
    #[serde(default = "default_idle_validation")]
    pub idle_validation_seconds: u64,
    /// Per-statement execution timeout.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Acquire timeout as a `Duration`.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    /// Idle validation interval as a `Duration`.
    pub fn idle_validation_interval(&self) -> Duration {
        Duration::from_secs(self.idle_validation_seconds)
    }

    /// Statement timeout as a `Duration`.
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_seconds)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            min_idle: default_min_idle(),
            max_total: default_max_total(),
            acquire_timeout_seconds: default_acquire_timeout(),
            idle_validation_seconds: default_idle_validation(),
            statement_timeout_seconds: default_statement_timeout(),
        }
    }
}

fn default_url() -> String {
    "sqlite://data/curio.db".to_string()
}

fn default_min_idle() -> u32 {
    1
}

fn default_max_total() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_idle_validation() -> u64 {
    60
}

fn default_statement_timeout() -> u64 {
    30
}
