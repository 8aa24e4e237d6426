//! HS256 token issue/verification (jsonwebtoken).

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, User, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or unsigned token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Verifies bearer tokens and returns their claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Shared-secret validator.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Our claims use RFC3339 `issued_at`/`expires_at` rather than the
        // registered numeric `exp`; the window is checked by `validate_claims`.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Mints tokens for users who just logged in.
pub struct Hs256JwtIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl Hs256JwtIssuer {
    pub fn new(secret: Vec<u8>, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(&secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = JwtClaims {
            sub: user.id,
            email: user.email.clone(),
            roles: vec![user.role.clone()],
            issued_at: now,
            expires_at: now + self.ttl,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RegisterUser, Role};

    fn user() -> User {
        User::register(
            RegisterUser {
                email: "jane@example.com".to_string(),
                full_name: "Jane Smith".to_string(),
                phone_number: None,
                address: None,
            },
            "hash".to_string(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let issuer = Hs256JwtIssuer::new(b"s3cret".to_vec(), Duration::minutes(10));
        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        let u = user();
        let now = Utc::now();

        let token = issuer.issue(&u, now).unwrap();
        let claims = validator.validate(&token, now).unwrap();

        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.roles, vec![Role::user()]);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = Hs256JwtIssuer::new(b"one".to_vec(), Duration::minutes(10));
        let validator = Hs256JwtValidator::new(b"two".to_vec());
        let now = Utc::now();

        let token = issuer.issue(&user(), now).unwrap();
        assert!(matches!(validator.validate(&token, now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = Hs256JwtIssuer::new(b"s3cret".to_vec(), Duration::minutes(1));
        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        let issued = Utc::now();

        let token = issuer.issue(&user(), issued).unwrap();
        let err = validator.validate(&token, issued + Duration::minutes(2)).unwrap_err();
        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }

    #[test]
    fn garbage_is_rejected() {
        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert!(validator.validate("not.a.jwt", Utc::now()).is_err());
    }
}
