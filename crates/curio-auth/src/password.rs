//! Argon2id password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use curio_core::config::AuthConfig;
use curio_core::error::{ConfigError, HashError};

/// Handles password hashing and verification using Argon2id.
///
/// Cost parameters come from [`AuthConfig`] so tests can run with a cheap
/// profile while production keeps a hardened one.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Creates a hasher from auth configuration. Rejects cost parameters
    /// outside the ranges Argon2 accepts.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        let params = Params::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
            None,
        )
        .map_err(|e| ConfigError::Invalid(format!("argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a plaintext password with a fresh random salt, producing a
    /// self-describing PHC string.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| HashError::Digest(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verifies a plaintext password against a stored PHC string.
    ///
    /// Returns `Ok(false)` on mismatch. A stored string that is not a
    /// parseable PHC hash is [`HashError::Malformed`]; any other digest
    /// failure also reads as a mismatch rather than leaking detail.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(stored).map_err(|_| HashError::Malformed)?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}
