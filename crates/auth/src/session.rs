//! Sessions and the session source.
//!
//! The identity provider owns sessions. Guards only ever read the current
//! session and listen for changes; sign-in and sign-out happen elsewhere.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::SubjectId;
use gatehouse_events::Subscription;

use crate::claims::SessionClaims;

/// Proof of authentication issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    subject_id: SubjectId,
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(subject_id: SubjectId, access_token: impl Into<String>) -> Self {
        Self {
            subject_id,
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Build a session from claims the transport layer already verified.
    pub fn from_verified_claims(claims: &SessionClaims, access_token: impl Into<String>) -> Self {
        Self {
            subject_id: claims.sub,
            access_token: access_token.into(),
            expires_at: claims.expires_at(),
        }
    }

    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    /// Raw access token, forwarded as a bearer header to the data store.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("subject_id", &self.subject_id)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What happened at the provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A session-change notification: the event plus the session after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn new(event: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),

    #[error("identity provider returned an invalid session: {0}")]
    InvalidSession(String),
}

/// Raw contract of the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError>;

    fn on_auth_state_change(&self) -> Subscription<SessionChange>;
}

#[async_trait]
impl<P> IdentityProvider for Arc<P>
where
    P: IdentityProvider + ?Sized,
{
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        (**self).get_session().await
    }

    fn on_auth_state_change(&self) -> Subscription<SessionChange> {
        (**self).on_auth_state_change()
    }
}

/// The session as guards see it.
///
/// `current_session` never fails: "nobody is signed in" is `None`, and so is
/// every provider failure.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn current_session(&self) -> Option<Session>;

    fn subscribe(&self) -> Subscription<SessionChange>;
}

#[async_trait]
impl<S> SessionSource for Arc<S>
where
    S: SessionSource + ?Sized,
{
    async fn current_session(&self) -> Option<Session> {
        (**self).current_session().await
    }

    fn subscribe(&self) -> Subscription<SessionChange> {
        (**self).subscribe()
    }
}

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Adapts an [`IdentityProvider`] into a fail-safe [`SessionSource`].
///
/// Provider errors, timeouts and expired sessions all read as "signed out".
pub struct ProviderSessionSource<P> {
    provider: P,
    timeout: Duration,
}

impl<P: IdentityProvider> ProviderSessionSource<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<P: IdentityProvider> SessionSource for ProviderSessionSource<P> {
    async fn current_session(&self) -> Option<Session> {
        match tokio::time::timeout(self.timeout, self.provider.get_session()).await {
            Ok(Ok(Some(session))) if session.is_expired(Utc::now()) => {
                tracing::debug!(subject_id = %session.subject_id(), "session expired; treating as signed out");
                None
            }
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "session lookup failed; treating as signed out");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "session lookup timed out; treating as signed out"
                );
                None
            }
        }
    }

    fn subscribe(&self) -> Subscription<SessionChange> {
        self.provider.on_auth_state_change()
    }
}

/// A session that never changes (one-shot evaluations, e.g. an HTTP request).
#[derive(Debug, Clone, Default)]
pub struct StaticSessionSource {
    session: Option<Session>,
}

impl StaticSessionSource {
    pub fn new(session: Option<Session>) -> Self {
        Self { session }
    }

    pub fn signed_out() -> Self {
        Self { session: None }
    }
}

#[async_trait]
impl SessionSource for StaticSessionSource {
    async fn current_session(&self) -> Option<Session> {
        self.session
            .clone()
            .filter(|s| !s.is_expired(Utc::now()))
    }

    fn subscribe(&self) -> Subscription<SessionChange> {
        Subscription::closed()
    }
}
