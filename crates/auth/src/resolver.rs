//! Role resolution: subject + requirement → authorization fact.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use gatehouse_core::SubjectId;

use crate::area::Requirement;
use crate::directory::{DirectoryStore, StoreError};
use crate::facts::{AuthorizationFact, SiteRoleSet};

/// Fetches the one authorization fact an area consults.
///
/// `Ok(None)` means the subject has no such fact. `Err` is reserved for real
/// fetch failures; the engine fails closed on those.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve(
        &self,
        subject: SubjectId,
        requirement: &Requirement,
    ) -> Result<Option<AuthorizationFact>, StoreError>;
}

#[async_trait]
impl<R> RoleResolver for Arc<R>
where
    R: RoleResolver + ?Sized,
{
    async fn resolve(
        &self,
        subject: SubjectId,
        requirement: &Requirement,
    ) -> Result<Option<AuthorizationFact>, StoreError> {
        (**self).resolve(subject, requirement).await
    }
}

/// Resolver backed by a [`DirectoryStore`]. Always reads fresh; nothing is
/// cached between resolutions.
#[derive(Clone)]
pub struct DirectoryRoleResolver {
    store: Arc<dyn DirectoryStore>,
}

impl DirectoryRoleResolver {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RoleResolver for DirectoryRoleResolver {
    async fn resolve(
        &self,
        subject: SubjectId,
        requirement: &Requirement,
    ) -> Result<Option<AuthorizationFact>, StoreError> {
        match requirement {
            Requirement::SiteRoles { any_of } => {
                let rows = self.store.roles_matching(subject, any_of).await?;
                if rows.is_empty() {
                    return Ok(None);
                }
                Ok(Some(AuthorizationFact::SiteRoles(SiteRoleSet {
                    subject_id: subject,
                    roles: rows.into_iter().collect(),
                })))
            }
            Requirement::AgentProfile => Ok(self
                .store
                .agent_profile(subject)
                .await?
                .map(AuthorizationFact::Agent)),
            Requirement::PortalProfile { .. } => Ok(self
                .store
                .portal_profile(subject)
                .await?
                .map(AuthorizationFact::Portal)),
        }
    }
}

/// Bounds every resolution by a deadline; an overrun is a fetch failure.
pub struct TimeoutResolver<R> {
    inner: R,
    timeout: Duration,
}

impl<R> TimeoutResolver<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<R: RoleResolver> RoleResolver for TimeoutResolver<R> {
    async fn resolve(
        &self,
        subject: SubjectId,
        requirement: &Requirement,
    ) -> Result<Option<AuthorizationFact>, StoreError> {
        match tokio::time::timeout(self.timeout, self.inner.resolve(subject, requirement)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "lookup exceeded {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
