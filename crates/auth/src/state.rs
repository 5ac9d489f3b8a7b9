//! Guard state machine.
//!
//! ```text
//!            ┌── no session ─────────────────────► UnauthorizedNoSession
//!            ├── fact satisfies requirement ─────► Authorized
//! Pending ───┼── no fact / wrong role (login) ───► UnauthorizedNoSession
//!            ├── wrong role (lateral) ───────────► UnauthorizedWrongRole
//!            └── fact inactive ──────────────────► Deactivated
//! ```
//!
//! Every session change starts a new cycle (back to `Pending`, next
//! generation). A cycle settles at most once, and only while it is the
//! newest one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::area::{AreaConfig, DeactivationNotice, DenialPolicy};
use crate::error::GuardError;

/// Client-side navigation instruction. Always replaces the history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub to: String,
    pub replace: bool,
}

impl Redirect {
    pub fn replace(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            replace: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GuardState {
    Pending,
    Authorized,
    UnauthorizedNoSession { redirect: Redirect },
    UnauthorizedWrongRole { redirect: Redirect },
    Deactivated { notice: DeactivationNotice },
}

impl GuardState {
    pub fn is_pending(&self) -> bool {
        matches!(self, GuardState::Pending)
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, GuardState::Authorized)
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            GuardState::UnauthorizedNoSession { redirect } | GuardState::UnauthorizedWrongRole { redirect } => {
                Some(redirect)
            }
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GuardState::Pending => "pending",
            GuardState::Authorized => "authorized",
            GuardState::UnauthorizedNoSession { .. } => "unauthorized_no_session",
            GuardState::UnauthorizedWrongRole { .. } => "unauthorized_wrong_role",
            GuardState::Deactivated { .. } => "deactivated",
        }
    }

    /// The transition table: where a finished resolution lands for `area`.
    pub fn from_resolution(area: &AreaConfig, resolution: &Result<(), GuardError>) -> Self {
        match resolution {
            Ok(()) => GuardState::Authorized,
            Err(GuardError::NoSession) => GuardState::UnauthorizedNoSession {
                redirect: area.login_redirect(),
            },
            Err(GuardError::Deactivated) => GuardState::Deactivated {
                notice: area.deactivated_notice.clone(),
            },
            Err(GuardError::RoleMismatch { actual }) => match area.denial {
                DenialPolicy::Lateral => match area.landing_for(actual) {
                    Some(redirect) => GuardState::UnauthorizedWrongRole { redirect },
                    // A role with nowhere to go is treated like no role at all.
                    None => GuardState::UnauthorizedNoSession {
                        redirect: area.denied_redirect(),
                    },
                },
                DenialPolicy::Login => GuardState::UnauthorizedNoSession {
                    redirect: area.denied_redirect(),
                },
            },
            Err(GuardError::NoAuthorizationFact) | Err(GuardError::BackendUnavailable(_)) => {
                GuardState::UnauthorizedNoSession {
                    redirect: area.denied_redirect(),
                }
            }
        }
    }
}

/// Tag of one resolution cycle. Strictly increasing per machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for Generation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettleRejected {
    #[error("stale resolution (generation {got}, current {current})")]
    Stale { got: Generation, current: Generation },

    #[error("cycle {0} already settled")]
    AlreadySettled(Generation),

    #[error("cannot settle into pending")]
    IntoPending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardMachine {
    state: GuardState,
    current: Generation,
}

impl Default for GuardMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardMachine {
    pub fn new() -> Self {
        Self {
            state: GuardState::Pending,
            current: Generation(0),
        }
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.current
    }

    /// Start a new cycle: back to `Pending`, previous cycles become stale.
    pub fn begin(&mut self) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.state = GuardState::Pending;
        self.current
    }

    /// Apply the result of cycle `generation`.
    pub fn settle(&mut self, generation: Generation, next: GuardState) -> Result<&GuardState, SettleRejected> {
        if generation != self.current {
            return Err(SettleRejected::Stale {
                got: generation,
                current: self.current,
            });
        }
        if !self.state.is_pending() {
            return Err(SettleRejected::AlreadySettled(generation));
        }
        if next.is_pending() {
            return Err(SettleRejected::IntoPending);
        }
        self.state = next;
        Ok(&self.state)
    }
}
