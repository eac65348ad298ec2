//! Parameterized query execution over pooled connections.
//!
//! Statements carry their parameters as a positional sequence and are always
//! bound, never interpolated. Results are fully materialized into dynamic
//! rows. A lost connection is marked broken before release and the statement
//! is retried exactly once on a freshly acquired connection.

use std::time::Duration;

use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tokio::time::timeout;
use tracing::warn;

use curio_core::config::database::DatabaseConfig;
use curio_core::error::QueryError;

use crate::connection::SqliteFactory;
use crate::pool::{Pool, PoolGuard};

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for SqlParam {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

/// A statement template plus its positional parameters.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    statement: String,
    params: Vec<SqlParam>,
}

impl QueryRequest {
    /// Start a request from a statement template with `?` placeholders.
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
        }
    }

    /// Append a positional parameter.
    pub fn bind(mut self, param: impl Into<SqlParam>) -> Self {
        self.params.push(param.into());
        self
    }

    /// The statement template.
    pub fn statement(&self) -> &str {
        &self.statement
    }
}

/// A dynamically typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One materialized result row: ordered column name/value pairs.
#[derive(Debug, Clone)]
pub struct ResultRow {
    columns: Vec<(String, SqlValue)>,
}

impl ResultRow {
    /// Value of the named column, if present.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Text column, or a decode error naming the column.
    pub fn text(&self, name: &str) -> Result<&str, QueryError> {
        match self.get(name) {
            Some(SqlValue::Text(v)) => Ok(v),
            other => Err(decode_error(name, "text", other)),
        }
    }

    /// Integer column.
    pub fn integer(&self, name: &str) -> Result<i64, QueryError> {
        match self.get(name) {
            Some(SqlValue::Integer(v)) => Ok(*v),
            other => Err(decode_error(name, "integer", other)),
        }
    }

    /// Real column. SQLite stores whole numbers as integers even in REAL
    /// columns, so both storage classes are accepted.
    pub fn real(&self, name: &str) -> Result<f64, QueryError> {
        match self.get(name) {
            Some(SqlValue::Real(v)) => Ok(*v),
            Some(SqlValue::Integer(v)) => Ok(*v as f64),
            other => Err(decode_error(name, "real", other)),
        }
    }

    /// Column names in result order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }
}

fn decode_error(name: &str, expected: &str, got: Option<&SqlValue>) -> QueryError {
    QueryError::Decode(format!("column '{name}': expected {expected}, got {got:?}"))
}

/// Runs bound statements on pooled connections and materializes results.
#[derive(Clone)]
pub struct QueryExecutor {
    pool: Pool<SqliteFactory>,
    statement_timeout: Duration,
}

impl QueryExecutor {
    /// Create an executor over the given pool.
    pub fn new(pool: Pool<SqliteFactory>, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            statement_timeout: config.statement_timeout(),
        }
    }

    /// Run a SELECT and materialize every row.
    pub async fn fetch_all(&self, request: &QueryRequest) -> Result<Vec<ResultRow>, QueryError> {
        let mut guard = self.pool.acquire().await?;
        match self.try_fetch(&mut guard, request).await {
            Err(QueryError::ConnectionLost(reason)) => {
                drop(guard);
                warn!(%reason, "connection lost mid-query, retrying once on a fresh connection");
                let mut retry = self.pool.acquire().await?;
                self.try_fetch(&mut retry, request).await
            }
            other => other,
        }
    }

    /// Run a SELECT expected to produce at most one row.
    pub async fn fetch_optional(
        &self,
        request: &QueryRequest,
    ) -> Result<Option<ResultRow>, QueryError> {
        Ok(self.fetch_all(request).await?.into_iter().next())
    }

    /// Run an INSERT/UPDATE/DELETE; returns the affected row count.
    pub async fn execute(&self, request: &QueryRequest) -> Result<u64, QueryError> {
        let mut guard = self.pool.acquire().await?;
        match self.try_execute(&mut guard, request).await {
            Err(QueryError::ConnectionLost(reason)) => {
                drop(guard);
                warn!(%reason, "connection lost mid-statement, retrying once on a fresh connection");
                let mut retry = self.pool.acquire().await?;
                self.try_execute(&mut retry, request).await
            }
            other => other,
        }
    }

    async fn try_fetch(
        &self,
        guard: &mut PoolGuard<SqliteFactory>,
        request: &QueryRequest,
    ) -> Result<Vec<ResultRow>, QueryError> {
        let query = build_query(request);
        match timeout(self.statement_timeout, query.fetch_all(&mut **guard)).await {
            Ok(Ok(rows)) => rows.iter().map(materialize_row).collect(),
            Ok(Err(e)) => Err(classify(guard, e)),
            Err(_) => {
                // The interrupted statement leaves the connection in an
                // unknown state; it must not be reused.
                guard.mark_broken();
                Err(QueryError::Timeout)
            }
        }
    }

    async fn try_execute(
        &self,
        guard: &mut PoolGuard<SqliteFactory>,
        request: &QueryRequest,
    ) -> Result<u64, QueryError> {
        let query = build_query(request);
        match timeout(self.statement_timeout, query.execute(&mut **guard)).await {
            Ok(Ok(result)) => Ok(result.rows_affected()),
            Ok(Err(e)) => Err(classify(guard, e)),
            Err(_) => {
                guard.mark_broken();
                Err(QueryError::Timeout)
            }
        }
    }
}

/// Map a driver error into the taxonomy, marking the connection broken when
/// the transport itself failed.
fn classify(guard: &mut PoolGuard<SqliteFactory>, err: sqlx::Error) -> QueryError {
    let mapped = map_sqlx_error(err);
    if matches!(mapped, QueryError::ConnectionLost(_)) {
        guard.mark_broken();
    }
    mapped
}

fn build_query(
    request: &QueryRequest,
) -> sqlx::query::Query<'_, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    let mut query = sqlx::query(request.statement());
    for param in &request.params {
        query = match param {
            SqlParam::Null => query.bind(None::<i64>),
            SqlParam::Integer(v) => query.bind(*v),
            SqlParam::Real(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_str()),
            SqlParam::Blob(v) => query.bind(v.as_slice()),
        };
    }
    query
}

fn materialize_row(row: &SqliteRow) -> Result<ResultRow, QueryError> {
    let mut columns = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row
            .try_get_raw(idx)
            .map_err(|e| QueryError::Decode(e.to_string()))?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => SqlValue::Integer(get(row, idx)?),
                "REAL" => SqlValue::Real(get(row, idx)?),
                "BLOB" => SqlValue::Blob(get(row, idx)?),
                _ => SqlValue::Text(get(row, idx)?),
            }
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(ResultRow { columns })
}

fn get<'r, T>(row: &'r SqliteRow, idx: usize) -> Result<T, QueryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(idx)
        .map_err(|e| QueryError::Decode(e.to_string()))
}

fn map_sqlx_error(err: sqlx::Error) -> QueryError {
    use sqlx::error::ErrorKind;

    match err {
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => QueryError::ConstraintViolation(db.message().to_string()),
            _ => QueryError::SyntaxOrSchema(db.message().to_string()),
        },
        sqlx::Error::Io(e) => QueryError::ConnectionLost(e.to_string()),
        sqlx::Error::Protocol(message) => QueryError::ConnectionLost(message),
        sqlx::Error::WorkerCrashed => {
            QueryError::ConnectionLost("database worker crashed".to_string())
        }
        sqlx::Error::ColumnNotFound(name) => {
            QueryError::SyntaxOrSchema(format!("unknown column: {name}"))
        }
        e @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
            QueryError::Decode(e.to_string())
        }
        other => QueryError::SyntaxOrSchema(other.to_string()),
    }
}
