//! Data-store contract for authorization lookups.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use gatehouse_core::SubjectId;

use crate::profiles::{AgentProfile, PortalProfile};
use crate::roles::Role;

/// A genuine fetch failure. "Row absent" is never an error; it is `None` or an
/// empty result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Read side of the directory: what the resolver needs.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Roles of `subject` restricted to `any_of` (the matching rows only).
    async fn roles_matching(&self, subject: SubjectId, any_of: &[Role]) -> Result<Vec<Role>, StoreError>;

    /// The subject's CRM agent record, if any.
    async fn agent_profile(&self, subject: SubjectId) -> Result<Option<AgentProfile>, StoreError>;

    /// The subject's portal record, if any.
    async fn portal_profile(&self, subject: SubjectId) -> Result<Option<PortalProfile>, StoreError>;
}

/// Administrative mutations (role grants, profile upkeep).
///
/// Guards never call these; admin screens and seeding do.
#[async_trait]
pub trait DirectoryAdmin: Send + Sync {
    async fn assign_role(&self, subject: SubjectId, role: Role) -> Result<(), StoreError>;

    async fn revoke_role(&self, subject: SubjectId, role: &Role) -> Result<(), StoreError>;

    async fn upsert_agent_profile(&self, profile: AgentProfile) -> Result<(), StoreError>;

    /// Returns `false` when the subject has no agent record.
    async fn set_agent_active(&self, subject: SubjectId, active: bool) -> Result<bool, StoreError>;

    async fn upsert_portal_profile(&self, profile: PortalProfile) -> Result<(), StoreError>;

    /// Returns `false` when the subject has no portal record.
    async fn set_portal_active(&self, subject: SubjectId, active: bool) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> DirectoryStore for Arc<S>
where
    S: DirectoryStore + ?Sized,
{
    async fn roles_matching(&self, subject: SubjectId, any_of: &[Role]) -> Result<Vec<Role>, StoreError> {
        (**self).roles_matching(subject, any_of).await
    }

    async fn agent_profile(&self, subject: SubjectId) -> Result<Option<AgentProfile>, StoreError> {
        (**self).agent_profile(subject).await
    }

    async fn portal_profile(&self, subject: SubjectId) -> Result<Option<PortalProfile>, StoreError> {
        (**self).portal_profile(subject).await
    }
}
