use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use gatehouse_auth::{AgentProfile, DirectoryAdmin, DirectoryStore, PortalProfile, Role, StoreError};
use gatehouse_core::SubjectId;

/// In-memory directory for tests/dev.
///
/// `set_unavailable(true)` makes every call fail like a dropped connection.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    roles: RwLock<HashMap<SubjectId, BTreeSet<Role>>>,
    agents: RwLock<HashMap<SubjectId, AgentProfile>>,
    portal_users: RwLock<HashMap<SubjectId, PortalProfile>>,
    unavailable: AtomicBool,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("directory lock poisoned".to_string())
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("directory offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn roles_matching(&self, subject: SubjectId, any_of: &[Role]) -> Result<Vec<Role>, StoreError> {
        self.check()?;
        let roles = self.roles.read().map_err(|_| poisoned())?;
        Ok(roles
            .get(&subject)
            .map(|held| held.iter().filter(|r| any_of.contains(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn agent_profile(&self, subject: SubjectId) -> Result<Option<AgentProfile>, StoreError> {
        self.check()?;
        let agents = self.agents.read().map_err(|_| poisoned())?;
        Ok(agents.get(&subject).cloned())
    }

    async fn portal_profile(&self, subject: SubjectId) -> Result<Option<PortalProfile>, StoreError> {
        self.check()?;
        let users = self.portal_users.read().map_err(|_| poisoned())?;
        Ok(users.get(&subject).cloned())
    }
}

#[async_trait]
impl DirectoryAdmin for InMemoryDirectory {
    async fn assign_role(&self, subject: SubjectId, role: Role) -> Result<(), StoreError> {
        self.check()?;
        let mut roles = self.roles.write().map_err(|_| poisoned())?;
        roles.entry(subject).or_default().insert(role);
        Ok(())
    }

    async fn revoke_role(&self, subject: SubjectId, role: &Role) -> Result<(), StoreError> {
        self.check()?;
        let mut roles = self.roles.write().map_err(|_| poisoned())?;
        if let Some(held) = roles.get_mut(&subject) {
            held.remove(role);
            if held.is_empty() {
                roles.remove(&subject);
            }
        }
        Ok(())
    }

    async fn upsert_agent_profile(&self, profile: AgentProfile) -> Result<(), StoreError> {
        self.check()?;
        let mut agents = self.agents.write().map_err(|_| poisoned())?;
        agents.insert(profile.subject_id, profile);
        Ok(())
    }

    async fn set_agent_active(&self, subject: SubjectId, active: bool) -> Result<bool, StoreError> {
        self.check()?;
        let mut agents = self.agents.write().map_err(|_| poisoned())?;
        Ok(match agents.get_mut(&subject) {
            Some(agent) => {
                agent.is_active = active;
                true
            }
            None => false,
        })
    }

    async fn upsert_portal_profile(&self, profile: PortalProfile) -> Result<(), StoreError> {
        self.check()?;
        let mut users = self.portal_users.write().map_err(|_| poisoned())?;
        users.insert(profile.subject_id, profile);
        Ok(())
    }

    async fn set_portal_active(&self, subject: SubjectId, active: bool) -> Result<bool, StoreError> {
        self.check()?;
        let mut users = self.portal_users.write().map_err(|_| poisoned())?;
        Ok(match users.get_mut(&subject) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        })
    }
}
