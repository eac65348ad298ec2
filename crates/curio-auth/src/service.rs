//! Login orchestration over the credential store, hasher, and token service.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use curio_core::error::{AuthError, HashError};
use curio_core::types::{CURRENT_HASH_VERSION, Credential};
use curio_database::repositories::CredentialRepository;

use crate::password::CredentialHasher;
use crate::token::{Claims, IssuedToken, TokenService};

/// Ties credential lookup, password verification, and token issuance into
/// the authentication flows.
#[derive(Clone)]
pub struct AuthService {
    credentials: CredentialRepository,
    hasher: CredentialHasher,
    tokens: TokenService,
    /// Verified against when the username is unknown, so both rejection
    /// paths pay the same digest cost.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        credentials: CredentialRepository,
        hasher: CredentialHasher,
        tokens: TokenService,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash("curio-dummy-password")?;
        Ok(Self {
            credentials,
            hasher,
            tokens,
            dummy_hash,
        })
    }

    /// Verifies the username/password pair and issues a session token.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable: both
    /// return [`AuthError::InvalidCredentials`], and the unknown-username
    /// path still runs a full verification against a dummy hash.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        match self.credentials.find_by_username(username).await? {
            Some(credential) => {
                let matched = match self
                    .verify_blocking(password.to_string(), credential.password_hash.clone())
                    .await?
                {
                    Ok(matched) => matched,
                    // A row with an unreadable hash must fail closed, not 500.
                    Err(HashError::Malformed) => {
                        warn!(username, "stored password hash is malformed");
                        false
                    }
                    Err(e) => return Err(e.into()),
                };
                if !matched {
                    return Err(AuthError::InvalidCredentials);
                }
                let issued = self.tokens.issue(credential.user_id, &credential.username)?;
                info!(username, "login succeeded");
                Ok(issued)
            }
            None => {
                // Burn the same digest work as the known-user path.
                let _ = self
                    .verify_blocking(password.to_string(), self.dummy_hash.clone())
                    .await?;
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Validates a session token and returns its claims. Used to gate every
    /// authenticated operation.
    pub fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(self.tokens.validate(token)?)
    }

    /// Exchanges a still-valid token for a fresh one.
    pub async fn refresh(&self, token: &str) -> Result<IssuedToken, AuthError> {
        let claims = self.tokens.validate(token)?;
        // The account may have been removed since issuance.
        let credential = self
            .credentials
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        Ok(self.tokens.issue(credential.user_id, &credential.username)?)
    }

    /// Replaces the caller's password after re-verifying the current one.
    ///
    /// Unlike login, a malformed stored hash surfaces here as
    /// [`HashError::Malformed`] so an operator can see the corrupt row.
    pub async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let claims = self.tokens.validate(token)?;
        let credential = self
            .credentials
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let matched = self
            .verify_blocking(old_password.to_string(), credential.password_hash.clone())
            .await??;
        if !matched {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = self.hash_blocking(new_password.to_string()).await??;
        let updated = self
            .credentials
            .update_password(credential.user_id, &new_hash, CURRENT_HASH_VERSION)
            .await?;
        if !updated {
            return Err(AuthError::InvalidCredentials);
        }
        info!(username = %credential.username, "password changed");
        Ok(())
    }

    /// Creates a new credential row. A taken username surfaces as a
    /// constraint violation from the store.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credential, AuthError> {
        let password_hash = self.hash_blocking(password.to_string()).await??;
        let credential = Credential {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            hash_version: CURRENT_HASH_VERSION,
            created_at: Utc::now(),
        };
        self.credentials.insert(&credential).await?;
        info!(username, "user created");
        Ok(credential)
    }

    /// True when no credentials exist yet, i.e. a fresh database.
    pub async fn is_empty(&self) -> Result<bool, AuthError> {
        Ok(self.credentials.count().await? == 0)
    }

    // Argon2 runs for tens of milliseconds at production cost; keep it off
    // the async workers.
    async fn verify_blocking(
        &self,
        password: String,
        stored: String,
    ) -> Result<Result<bool, HashError>, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| AuthError::Internal(format!("verify task failed: {e}")))
    }

    async fn hash_blocking(
        &self,
        password: String,
    ) -> Result<Result<String, HashError>, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hash task failed: {e}")))
    }
}
