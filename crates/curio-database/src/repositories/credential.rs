//! Repository for stored user credentials.

use chrono::{DateTime, Utc};
use curio_core::error::QueryError;
use curio_core::types::Credential;
use uuid::Uuid;

use crate::executor::{QueryExecutor, QueryRequest, ResultRow};

/// Reads and writes `users` rows.
#[derive(Clone)]
pub struct CredentialRepository {
    executor: QueryExecutor,
}

impl CredentialRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Looks up a credential by its unique username.
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Credential>, QueryError> {
        let request = QueryRequest::new(
            "SELECT id, username, password_hash, hash_version, created_at \
             FROM users WHERE username = ?",
        )
        .bind(username);
        match self.executor.fetch_optional(&request).await? {
            Some(row) => Ok(Some(decode_credential(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, QueryError> {
        let request = QueryRequest::new(
            "SELECT id, username, password_hash, hash_version, created_at \
             FROM users WHERE id = ?",
        )
        .bind(id.to_string());
        match self.executor.fetch_optional(&request).await? {
            Some(row) => Ok(Some(decode_credential(&row)?)),
            None => Ok(None),
        }
    }

    /// Inserts a new credential row. A duplicate username surfaces as
    /// [`QueryError::ConstraintViolation`].
    pub async fn insert(&self, credential: &Credential) -> Result<(), QueryError> {
        let request = QueryRequest::new(
            "INSERT INTO users (id, username, password_hash, hash_version, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(credential.user_id.to_string())
        .bind(credential.username.as_str())
        .bind(credential.password_hash.as_str())
        .bind(credential.hash_version)
        .bind(credential.created_at.to_rfc3339());
        self.executor.execute(&request).await?;
        Ok(())
    }

    /// Replaces the stored hash for one user. Returns `false` when no row
    /// matched the id.
    pub async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        hash_version: i64,
    ) -> Result<bool, QueryError> {
        let request = QueryRequest::new(
            "UPDATE users SET password_hash = ?, hash_version = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(hash_version)
        .bind(id.to_string());
        let affected = self.executor.execute(&request).await?;
        Ok(affected > 0)
    }

    pub async fn count(&self) -> Result<i64, QueryError> {
        let request = QueryRequest::new("SELECT COUNT(*) AS n FROM users");
        let row = self
            .executor
            .fetch_optional(&request)
            .await?
            .ok_or_else(|| QueryError::Decode("count query returned no row".to_string()))?;
        row.integer("n")
    }
}

fn decode_credential(row: &ResultRow) -> Result<Credential, QueryError> {
    let user_id = Uuid::parse_str(row.text("id")?)
        .map_err(|e| QueryError::Decode(format!("column 'id': {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(row.text("created_at")?)
        .map_err(|e| QueryError::Decode(format!("column 'created_at': {e}")))?
        .with_timezone(&Utc);
    Ok(Credential {
        user_id,
        username: row.text("username")?.to_string(),
        password_hash: row.text("password_hash")?.to_string(),
        hash_version: row.integer("hash_version")?,
        created_at,
    })
}
