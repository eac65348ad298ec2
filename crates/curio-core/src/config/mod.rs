//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate and merged with `CURIO`-prefixed environment variables.
//! Each sub-module represents a logical configuration section.

pub mod auth;
pub mod cache;
pub mod database;
pub mod logging;
pub mod server;

use serde::{Deserialize, Serialize};

pub use self::auth::AuthConfig;
pub use self::cache::CacheConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::server::ServerConfig;

use crate::error::ConfigError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// TCP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database and connection pool settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Catalog cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `CURIO`.
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CURIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_usable() {
        let config = AppConfig::default();
        assert!(config.database.max_total >= config.database.min_idle);
        assert!(config.auth.token_ttl_seconds > 0);
        assert_eq!(config.logging.level, "info");
    }
}
