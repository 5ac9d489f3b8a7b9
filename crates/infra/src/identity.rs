//! In-process identity provider.
//!
//! Holds one current session and broadcasts every change over an
//! [`InMemoryEventBus`]. Used by the local dev wiring and the integration
//! tests; a hosted provider would implement [`IdentityProvider`] the same way.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use gatehouse_auth::{AuthChangeEvent, IdentityProvider, ProviderError, Session, SessionChange};
use gatehouse_events::{EventBus, InMemoryEventBus, Subscription};

#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    current: RwLock<Option<Session>>,
    bus: InMemoryEventBus<SessionChange>,
    reachable: AtomicBool,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            bus: InMemoryEventBus::new(),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn sign_in(&self, session: Session) {
        self.replace(Some(session), AuthChangeEvent::SignedIn);
    }

    pub fn sign_out(&self) {
        self.replace(None, AuthChangeEvent::SignedOut);
    }

    /// Swap in a fresh token for the same subject.
    pub fn refresh_token(&self, session: Session) {
        self.replace(Some(session), AuthChangeEvent::TokenRefreshed);
    }

    /// Simulate an outage: `get_session` fails while unreachable.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of live change listeners.
    pub fn listeners(&self) -> usize {
        self.bus.subscriber_count()
    }

    fn replace(&self, session: Option<Session>, event: AuthChangeEvent) {
        {
            let mut current = self
                .current
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *current = session.clone();
        }

        tracing::debug!(event = ?event, subject_id = ?session.as_ref().map(Session::subject_id), "session changed");

        if let Err(e) = self.bus.publish(SessionChange::new(event, session)) {
            tracing::warn!(error = %e, "failed to broadcast session change");
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(ProviderError::Unreachable("identity provider offline".into()));
        }
        let current = self
            .current
            .read()
            .map_err(|_| ProviderError::Unreachable("session state poisoned".into()))?;
        Ok(current.clone())
    }

    fn on_auth_state_change(&self) -> Subscription<SessionChange> {
        self.bus.subscribe()
    }
}
