//! Why a guard did not authorize.

use thiserror::Error;

use crate::profiles::PortalRole;

/// Denial taxonomy for a single resolution.
///
/// Only `Deactivated` is ever shown to the visitor. Every other variant turns
/// into a silent redirect, and `BackendUnavailable` is indistinguishable from a
/// plain denial on the visitor's side (it is logged instead).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("no session")]
    NoSession,

    #[error("no authorization fact for this area")]
    NoAuthorizationFact,

    #[error("portal role mismatch (subject is '{actual}')")]
    RoleMismatch { actual: PortalRole },

    #[error("account deactivated")]
    Deactivated,

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}
