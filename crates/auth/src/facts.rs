//! Authorization facts and how an area judges them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use gatehouse_core::SubjectId;

use crate::area::Requirement;
use crate::error::GuardError;
use crate::profiles::{AgentProfile, PortalProfile};
use crate::roles::{Role, grants_any};

/// The site-wide roles a subject holds (unordered).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRoleSet {
    pub subject_id: SubjectId,
    pub roles: BTreeSet<Role>,
}

/// Area-specific authorization data for one subject.
///
/// At most one fact is consulted per (subject, area) resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthorizationFact {
    SiteRoles(SiteRoleSet),
    Agent(AgentProfile),
    Portal(PortalProfile),
}

impl AuthorizationFact {
    pub fn subject_id(&self) -> SubjectId {
        match self {
            AuthorizationFact::SiteRoles(set) => set.subject_id,
            AuthorizationFact::Agent(agent) => agent.subject_id,
            AuthorizationFact::Portal(profile) => profile.subject_id,
        }
    }
}

/// Judge a (possibly absent) fact against an area's requirement.
///
/// Activation is checked before the role discriminant: a deactivated account is
/// `Deactivated` whatever its role.
pub fn assess(fact: Option<&AuthorizationFact>, requirement: &Requirement) -> Result<(), GuardError> {
    match (requirement, fact) {
        (_, None) => Err(GuardError::NoAuthorizationFact),

        (Requirement::SiteRoles { any_of }, Some(AuthorizationFact::SiteRoles(set))) => {
            if grants_any(&set.roles, any_of) {
                Ok(())
            } else {
                Err(GuardError::NoAuthorizationFact)
            }
        }

        (Requirement::AgentProfile, Some(AuthorizationFact::Agent(agent))) => {
            if agent.is_active {
                Ok(())
            } else {
                Err(GuardError::Deactivated)
            }
        }

        (Requirement::PortalProfile { role }, Some(AuthorizationFact::Portal(profile))) => {
            if !profile.is_active {
                return Err(GuardError::Deactivated);
            }
            match role {
                Some(required) if *required != profile.role => Err(GuardError::RoleMismatch {
                    actual: profile.role.clone(),
                }),
                _ => Ok(()),
            }
        }

        // A fact of the wrong kind is not a fact for this area.
        (_, Some(other)) => {
            tracing::debug!(subject_id = %other.subject_id(), "fact kind does not match area requirement");
            Err(GuardError::NoAuthorizationFact)
        }
    }
}
