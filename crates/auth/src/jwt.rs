//! HS256 token signing and verification.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use depot_core::UserId;

use crate::{JwtClaims, Role, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or badly signed token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Encode(String),
}

/// Mints access tokens for authenticated users.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: UserId, role: &Role, now: DateTime<Utc>) -> Result<String, TokenError>;
}

/// Verifies bearer tokens presented on requests.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Shared-secret HS256 implementation of both sides.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);
        validation
    }
}

impl TokenIssuer for Hs256Jwt {
    fn issue(&self, user_id: UserId, role: &Role, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = JwtClaims {
            sub: user_id,
            role: role.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = decode::<JwtClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(secret: &str) -> Hs256Jwt {
        Hs256Jwt::new(secret, Duration::minutes(10))
    }

    #[test]
    fn issued_token_validates() {
        let now = Utc::now();
        let j = jwt("secret");
        let token = j.issue(UserId::new(9), &Role::STOCK_MANAGER, now).unwrap();
        let claims = j.validate(&token, now).unwrap();
        assert_eq!(claims.sub, UserId::new(9));
        assert_eq!(claims.role, Role::STOCK_MANAGER);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let now = Utc::now();
        let token = jwt("one").issue(UserId::new(1), &Role::ADMIN, now).unwrap();
        assert!(matches!(jwt("two").validate(&token, now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn token_expires_after_ttl() {
        let now = Utc::now();
        let j = jwt("secret");
        let token = j.issue(UserId::new(1), &Role::ADMIN, now).unwrap();
        let later = now + Duration::minutes(11);
        assert_eq!(
            j.validate(&token, later),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(jwt("secret").validate("not-a-token", Utc::now()).is_err());
    }
}
