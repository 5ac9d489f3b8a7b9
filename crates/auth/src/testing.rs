//! Test doubles shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc, watch};

use gatehouse_core::SubjectId;
use gatehouse_events::{EventBus, InMemoryEventBus, Subscription};

use crate::area::Requirement;
use crate::directory::{DirectoryStore, StoreError};
use crate::engine::GuardContext;
use crate::facts::AuthorizationFact;
use crate::profiles::{AgentProfile, PortalProfile};
use crate::resolver::{DirectoryRoleResolver, RoleResolver};
use crate::roles::Role;
use crate::session::{AuthChangeEvent, Session, SessionChange, SessionSource};
use crate::state::GuardState;

/// A provider-side session that tests can sign in and out.
#[derive(Default)]
pub struct TestSessions {
    current: Mutex<Option<Session>>,
    bus: InMemoryEventBus<SessionChange>,
}

impl TestSessions {
    pub fn signed_in(subject: SubjectId) -> Arc<Self> {
        let sessions = Arc::new(Self::default());
        *sessions.current.lock().unwrap() = Some(Session::new(subject, format!("token-{subject}")));
        sessions
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sign_in(&self, subject: SubjectId) {
        let session = Session::new(subject, format!("token-{subject}"));
        *self.current.lock().unwrap() = Some(session.clone());
        self.bus
            .publish(SessionChange::new(AuthChangeEvent::SignedIn, Some(session)))
            .unwrap();
    }

    pub fn sign_out(&self) {
        *self.current.lock().unwrap() = None;
        self.bus
            .publish(SessionChange::new(AuthChangeEvent::SignedOut, None))
            .unwrap();
    }

    pub fn listeners(&self) -> usize {
        self.bus.subscriber_count()
    }
}

#[async_trait]
impl SessionSource for TestSessions {
    async fn current_session(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }

    fn subscribe(&self) -> Subscription<SessionChange> {
        self.bus.subscribe()
    }
}

/// Minimal directory with an outage switch.
#[derive(Default)]
pub struct TestDirectory {
    roles: Mutex<HashMap<SubjectId, Vec<Role>>>,
    agents: Mutex<HashMap<SubjectId, AgentProfile>>,
    portal: Mutex<HashMap<SubjectId, PortalProfile>>,
    down: AtomicBool,
}

impl TestDirectory {
    pub fn with_roles(self, subject: SubjectId, roles: &[&'static str]) -> Self {
        self.roles
            .lock()
            .unwrap()
            .insert(subject, roles.iter().copied().map(Role::from_static).collect());
        self
    }

    pub fn with_agent(self, profile: AgentProfile) -> Self {
        self.agents.lock().unwrap().insert(profile.subject_id, profile);
        self
    }

    pub fn with_portal(self, profile: PortalProfile) -> Self {
        self.portal.lock().unwrap().insert(profile.subject_id, profile);
        self
    }

    pub fn set_agent_active(&self, subject: SubjectId, active: bool) {
        if let Some(agent) = self.agents.lock().unwrap().get_mut(&subject) {
            agent.is_active = active;
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection reset".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DirectoryStore for TestDirectory {
    async fn roles_matching(&self, subject: SubjectId, any_of: &[Role]) -> Result<Vec<Role>, StoreError> {
        self.check()?;
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&subject)
            .map(|held| held.iter().filter(|r| any_of.contains(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn agent_profile(&self, subject: SubjectId) -> Result<Option<AgentProfile>, StoreError> {
        self.check()?;
        Ok(self.agents.lock().unwrap().get(&subject).cloned())
    }

    async fn portal_profile(&self, subject: SubjectId) -> Result<Option<PortalProfile>, StoreError> {
        self.check()?;
        Ok(self.portal.lock().unwrap().get(&subject).cloned())
    }
}

/// Counts resolver calls (to prove the no-session short-circuit).
pub struct CountingResolver<R> {
    inner: R,
    calls: AtomicUsize,
}

impl<R> CountingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: RoleResolver> RoleResolver for CountingResolver<R> {
    async fn resolve(
        &self,
        subject: SubjectId,
        requirement: &Requirement,
    ) -> Result<Option<AuthorizationFact>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(subject, requirement).await
    }
}

/// Holds resolutions for one subject until released; reports when they start.
pub struct GatedResolver<R> {
    inner: R,
    gated: SubjectId,
    gate: Notify,
    entered: mpsc::UnboundedSender<SubjectId>,
}

impl<R> GatedResolver<R> {
    pub fn new(inner: R, gated: SubjectId) -> (Self, mpsc::UnboundedReceiver<SubjectId>) {
        let (entered, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner,
                gated,
                gate: Notify::new(),
                entered,
            },
            rx,
        )
    }

    pub fn release(&self) {
        self.gate.notify_waiters();
    }
}

#[async_trait]
impl<R: RoleResolver> RoleResolver for GatedResolver<R> {
    async fn resolve(
        &self,
        subject: SubjectId,
        requirement: &Requirement,
    ) -> Result<Option<AuthorizationFact>, StoreError> {
        let _ = self.entered.send(subject);
        if subject == self.gated {
            self.gate.notified().await;
        }
        self.inner.resolve(subject, requirement).await
    }
}

pub fn resolver_for(directory: Arc<TestDirectory>) -> DirectoryRoleResolver {
    DirectoryRoleResolver::new(directory)
}

pub fn context(sessions: Arc<TestSessions>, resolver: Arc<dyn RoleResolver>) -> GuardContext {
    GuardContext::new(sessions, resolver)
}

/// Wait (bounded) until the watched state satisfies `pred`.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<GuardState>,
    pred: impl FnMut(&GuardState) -> bool,
) -> GuardState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("guard state did not settle in time")
        .expect("guard state channel closed")
        .clone()
}
