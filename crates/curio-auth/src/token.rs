//! Session token issuance and validation (HS256).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use curio_core::clock::{Clock, SystemClock};
use curio_core::config::AuthConfig;
use curio_core::error::TokenError;

/// Claims carried inside every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id the token was issued for.
    pub sub: Uuid,
    /// Username at issuance time.
    pub username: String,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch. A token is valid up to and including
    /// this instant.
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
}

/// A freshly signed token with its validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs and validates session tokens.
///
/// Expiry is checked against an injected [`Clock`] rather than the library's
/// wall-clock check, so the boundary instant is exact and testable.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenService {
    /// Creates a token service from auth configuration, using the system
    /// clock.
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a token service with an explicit clock.
    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced below against the injected clock.
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(config.token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.token_secret.as_bytes()),
            validation,
            ttl_seconds: config.token_ttl_seconds as i64,
            clock,
        }
    }

    /// Signs a new token for the given user.
    pub fn issue(&self, user_id: Uuid, username: &str) -> Result<IssuedToken, TokenError> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + chrono::Duration::seconds(self.ttl_seconds);

        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| TokenError::Malformed)?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Validates a token's signature and expiry and returns its claims.
    ///
    /// A token whose `exp` equals the current instant is still valid; one
    /// second past it is [`TokenError::Expired`].
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;

        if self.clock.now().timestamp() > data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Clock pinned to a settable instant.
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(now),
            })
        }

        fn advance(&self, seconds: i64) {
            let mut guard = self.now.lock().unwrap();
            *guard += chrono::Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn test_config() -> AuthConfig {
        AuthConfig {
            token_secret: "test-secret".to_string(),
            token_ttl_seconds: 900,
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_issue_then_validate_round_trip() {
        let service = TokenService::new(&test_config());
        let user_id = Uuid::new_v4();
        let issued = service.issue(user_id, "ana").unwrap();

        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_token_valid_at_exact_expiry_instant() {
        let start = Utc::now();
        let clock = ManualClock::at(start);
        let service = TokenService::with_clock(&test_config(), clock.clone());
        let issued = service.issue(Uuid::new_v4(), "ana").unwrap();

        clock.advance(900);
        assert!(service.validate(&issued.token).is_ok());

        clock.advance(1);
        assert_eq!(
            service.validate(&issued.token).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let service = TokenService::new(&test_config());
        let issued = service.issue(Uuid::new_v4(), "ana").unwrap();

        let other = TokenService::new(&AuthConfig {
            token_secret: "different-secret".to_string(),
            ..test_config()
        });
        assert_eq!(
            other.validate(&issued.token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let service = TokenService::new(&test_config());
        assert_eq!(
            service.validate("definitely.not.a-token").unwrap_err(),
            TokenError::Malformed
        );
        assert_eq!(service.validate("").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let service = TokenService::new(&test_config());
        let issued = service.issue(Uuid::new_v4(), "ana").unwrap();

        // Swap the payload segment for a different one; signature no longer
        // covers it.
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let other = service.issue(Uuid::new_v4(), "eve").unwrap();
        let other_parts: Vec<&str> = other.token.split('.').collect();
        parts[1] = other_parts[1];
        let tampered = parts.join(".");

        assert_eq!(
            service.validate(&tampered).unwrap_err(),
            TokenError::InvalidSignature
        );
    }
}
