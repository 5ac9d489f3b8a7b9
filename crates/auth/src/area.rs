//! Per-area guard configuration.
//!
//! Every guarded area (admin pages, CRM, each portal section) is one
//! `AreaConfig` row driving the same engine. Areas differ only in what fact
//! they consult and where a denied visitor is sent.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gatehouse_core::{DomainError, DomainResult};

use crate::profiles::PortalRole;
use crate::roles::Role;
use crate::state::Redirect;

/// Which authorization fact an area consults, and what it must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// Site-wide roles; any one of `any_of` is enough.
    SiteRoles { any_of: Vec<Role> },
    /// An active CRM agent record.
    AgentProfile,
    /// An active portal record, optionally with a specific role.
    PortalProfile {
        #[serde(default)]
        role: Option<PortalRole>,
    },
}

/// Where a signed-in visitor without the right role goes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialPolicy {
    /// Back to the area's login route, same as having no session.
    #[default]
    Login,
    /// Sideways, to the landing page of the role the visitor does have.
    Lateral,
}

/// Static message shown to deactivated accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivationNotice {
    pub title: String,
    pub body: String,
}

impl Default for DeactivationNotice {
    fn default() -> Self {
        Self {
            title: "Account Deactivated".to_string(),
            body: "Your account has been deactivated. Please contact an administrator.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaConfig {
    pub name: String,
    pub requirement: Requirement,
    pub login_route: String,
    #[serde(default)]
    pub denial: DenialPolicy,
    /// Query marker (`key=value`) appended to the login route when a session
    /// exists but no fact does.
    #[serde(default)]
    pub missing_fact_marker: Option<String>,
    #[serde(default)]
    pub landing_routes: BTreeMap<PortalRole, String>,
    #[serde(default)]
    pub deactivated_notice: DeactivationNotice,
}

impl AreaConfig {
    pub fn new(name: impl Into<String>, requirement: Requirement, login_route: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirement,
            login_route: login_route.into(),
            denial: DenialPolicy::Login,
            missing_fact_marker: None,
            landing_routes: BTreeMap::new(),
            deactivated_notice: DeactivationNotice::default(),
        }
    }

    pub fn with_denial(mut self, denial: DenialPolicy) -> Self {
        self.denial = denial;
        self
    }

    pub fn with_missing_fact_marker(mut self, marker: impl Into<String>) -> Self {
        self.missing_fact_marker = Some(marker.into());
        self
    }

    pub fn with_landing(mut self, role: PortalRole, route: impl Into<String>) -> Self {
        self.landing_routes.insert(role, route.into());
        self
    }

    /// Redirect for visitors with no session.
    pub fn login_redirect(&self) -> Redirect {
        Redirect::replace(self.login_route.clone())
    }

    /// Redirect for signed-in visitors who lack the fact (or whose lookup failed).
    pub fn denied_redirect(&self) -> Redirect {
        match &self.missing_fact_marker {
            Some(marker) => {
                let sep = if self.login_route.contains('?') { '&' } else { '?' };
                Redirect::replace(format!("{}{}{}", self.login_route, sep, marker))
            }
            None => self.login_redirect(),
        }
    }

    /// Landing page for a portal role, if this area knows one.
    pub fn landing_for(&self, role: &PortalRole) -> Option<Redirect> {
        self.landing_routes
            .get(role)
            .map(|route| Redirect::replace(route.clone()))
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("area name must not be empty"));
        }
        if !self.login_route.starts_with('/') {
            return Err(DomainError::validation(format!(
                "area '{}': login_route must be an absolute path",
                self.name
            )));
        }
        if let Requirement::SiteRoles { any_of } = &self.requirement {
            if any_of.is_empty() {
                return Err(DomainError::validation(format!(
                    "area '{}': site role requirement needs at least one role",
                    self.name
                )));
            }
        }
        if self.denial == DenialPolicy::Lateral {
            let role_bound = matches!(self.requirement, Requirement::PortalProfile { role: Some(_) });
            if !role_bound || self.landing_routes.is_empty() {
                return Err(DomainError::validation(format!(
                    "area '{}': lateral denial needs a portal role requirement and landing routes",
                    self.name
                )));
            }
        }
        if let Some((role, route)) = self.landing_routes.iter().find(|(_, r)| !r.starts_with('/')) {
            return Err(DomainError::validation(format!(
                "area '{}': landing route for '{}' must be an absolute path (got '{}')",
                self.name, role, route
            )));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Built-in areas
    // ─────────────────────────────────────────────────────────────────────

    /// Apartment listings back office.
    pub fn apartments_admin() -> Self {
        Self::new(
            "apartments_admin",
            Requirement::SiteRoles {
                any_of: vec![Role::ADMIN, Role::APARTMENTS_EDITOR],
            },
            "/apartments/login",
        )
    }

    /// Blog / Q&A editing.
    pub fn site_admin() -> Self {
        Self::new(
            "site_admin",
            Requirement::SiteRoles {
                any_of: vec![Role::ADMIN, Role::EDITOR],
            },
            "/admin/login",
        )
    }

    pub fn crm_agent() -> Self {
        Self::new("crm_agent", Requirement::AgentProfile, "/crm/login")
    }

    pub fn portal_client() -> Self {
        Self::portal_section("portal_client", PortalRole::CLIENT)
    }

    pub fn portal_advisor() -> Self {
        Self::portal_section("portal_advisor", PortalRole::ADVISOR)
    }

    /// Pages any portal user may see (profile, documents).
    pub fn portal_any() -> Self {
        Self::new(
            "portal_any",
            Requirement::PortalProfile { role: None },
            "/portal/login",
        )
        .with_missing_fact_marker("error=unauthorized")
    }

    fn portal_section(name: &str, role: PortalRole) -> Self {
        Self::new(
            name,
            Requirement::PortalProfile { role: Some(role) },
            "/portal/login",
        )
        .with_denial(DenialPolicy::Lateral)
        .with_missing_fact_marker("error=unauthorized")
        .with_landing(PortalRole::CLIENT, "/portal/client/dashboard")
        .with_landing(PortalRole::ADVISOR, "/portal/advisor/dashboard")
        .with_landing(PortalRole::ADMIN, "/portal/admin/dashboard")
    }
}

/// The set of configured areas, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct AreaRegistry {
    areas: BTreeMap<String, Arc<AreaConfig>>,
}

impl AreaRegistry {
    /// Validate and index `areas`. Duplicate names are rejected.
    pub fn new(areas: impl IntoIterator<Item = AreaConfig>) -> DomainResult<Self> {
        let mut indexed = BTreeMap::new();
        for area in areas {
            area.validate()?;
            let name = area.name.clone();
            if indexed.insert(name.clone(), Arc::new(area)).is_some() {
                return Err(DomainError::validation(format!("duplicate area '{name}'")));
            }
        }
        Ok(Self { areas: indexed })
    }

    pub fn presets() -> Self {
        let presets = [
            AreaConfig::apartments_admin(),
            AreaConfig::site_admin(),
            AreaConfig::crm_agent(),
            AreaConfig::portal_client(),
            AreaConfig::portal_advisor(),
            AreaConfig::portal_any(),
        ];
        Self {
            areas: presets
                .into_iter()
                .map(|a| (a.name.clone(), Arc::new(a)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<AreaConfig>> {
        self.areas.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.areas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
