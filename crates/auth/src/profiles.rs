//! Per-subject profile records consulted by the CRM and portal areas.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use gatehouse_core::SubjectId;

/// CRM agent record: one per subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub subject_id: SubjectId,
    pub full_name: String,
    pub email: Option<String>,
    pub is_active: bool,
}

impl AgentProfile {
    pub fn new(subject_id: SubjectId, full_name: impl Into<String>) -> Self {
        Self {
            subject_id,
            full_name: full_name.into(),
            email: None,
            is_active: true,
        }
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Portal role discriminant (`client`, `advisor`, `admin`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortalRole(Cow<'static, str>);

impl PortalRole {
    pub const CLIENT: PortalRole = PortalRole(Cow::Borrowed("client"));
    pub const ADVISOR: PortalRole = PortalRole(Cow::Borrowed("advisor"));
    pub const ADMIN: PortalRole = PortalRole(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PortalRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client/advisor portal record: one per subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalProfile {
    pub subject_id: SubjectId,
    pub full_name: String,
    pub email: Option<String>,
    pub role: PortalRole,
    pub is_active: bool,
}

impl PortalProfile {
    pub fn new(subject_id: SubjectId, full_name: impl Into<String>, role: PortalRole) -> Self {
        Self {
            subject_id,
            full_name: full_name.into(),
            email: None,
            role,
            is_active: true,
        }
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}
