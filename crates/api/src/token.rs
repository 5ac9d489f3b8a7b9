//! Bearer token verification.
//!
//! Tokens are HS256 JWTs issued by the identity provider. Signature checks
//! happen here; the time window goes through [`validate_claims`] so every
//! caller applies the same rule.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use gatehouse_auth::{ClaimsError, SessionClaims, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed or unsigned token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] ClaimsError),
}

pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.key, &self.validation)?.claims;
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}
