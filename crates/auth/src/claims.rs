use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::SubjectId;

/// Access-token claims issued by the identity provider (transport-agnostic).
///
/// Only the claims the guards rely on are modeled; anything else the provider
/// puts in the token is ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / user identifier.
    pub sub: SubjectId,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiration, seconds since the Unix epoch.
    pub exp: i64,
}

impl SessionClaims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("token timestamp out of range")]
    InvalidTimestamp,
}

/// Deterministically validate the claims' time window.
///
/// Signature verification and decoding happen in the transport layer.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), ClaimsError> {
    let issued_at = claims.issued_at().ok_or(ClaimsError::InvalidTimestamp)?;
    let expires_at = claims.expires_at().ok_or(ClaimsError::InvalidTimestamp)?;

    if expires_at <= issued_at {
        return Err(ClaimsError::InvalidTimeWindow);
    }
    if now < issued_at {
        return Err(ClaimsError::NotYetValid);
    }
    if now >= expires_at {
        return Err(ClaimsError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(iat: DateTime<Utc>, exp: DateTime<Utc>) -> SessionClaims {
        SessionClaims {
            sub: SubjectId::new(),
            iat: iat.timestamp(),
            exp: exp.timestamp(),
        }
    }

    #[test]
    fn accepts_a_live_window() {
        let now = Utc::now();
        let c = claims(now - Duration::minutes(1), now + Duration::minutes(10));
        assert_eq!(validate_claims(&c, now), Ok(()));
    }

    #[test]
    fn rejects_expired_tokens() {
        let now = Utc::now();
        let c = claims(now - Duration::hours(2), now - Duration::hours(1));
        assert_eq!(validate_claims(&c, now), Err(ClaimsError::Expired));
    }

    #[test]
    fn rejects_tokens_from_the_future() {
        let now = Utc::now();
        let c = claims(now + Duration::minutes(5), now + Duration::minutes(10));
        assert_eq!(validate_claims(&c, now), Err(ClaimsError::NotYetValid));
    }

    #[test]
    fn rejects_inverted_windows() {
        let now = Utc::now();
        let c = claims(now, now);
        assert_eq!(validate_claims(&c, now), Err(ClaimsError::InvalidTimeWindow));
    }

    #[test]
    fn rejects_out_of_range_timestamps() {
        let c = SessionClaims {
            sub: SubjectId::new(),
            iat: 0,
            exp: i64::MAX,
        };
        assert_eq!(validate_claims(&c, Utc::now()), Err(ClaimsError::InvalidTimestamp));
    }
}
