//! SQLite transport factory for the connection pool.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use tracing::{debug, info};

use curio_core::config::database::DatabaseConfig;
use curio_core::error::PoolError;

use crate::pool::ConnectionFactory;

/// Opens SQLite connections for the pool.
///
/// WAL journaling is enabled so several pooled connections can work on the
/// same database file concurrently.
#[derive(Debug, Clone)]
pub struct SqliteFactory {
    options: SqliteConnectOptions,
}

impl SqliteFactory {
    /// Build a factory from configuration.
    pub fn new(config: &DatabaseConfig) -> Result<Self, PoolError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| PoolError::Connect(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        info!(url = %config.url, "sqlite connection factory ready");
        Ok(Self { options })
    }
}

#[async_trait]
impl ConnectionFactory for SqliteFactory {
    type Conn = SqliteConnection;

    async fn connect(&self) -> Result<SqliteConnection, PoolError> {
        self.options
            .connect()
            .await
            .map_err(|e| PoolError::Connect(e.to_string()))
    }

    async fn ping(&self, conn: &mut SqliteConnection) -> bool {
        conn.ping().await.is_ok()
    }

    async fn close(&self, conn: SqliteConnection) {
        if let Err(e) = conn.close().await {
            debug!("error closing sqlite connection: {e}");
        }
    }
}
