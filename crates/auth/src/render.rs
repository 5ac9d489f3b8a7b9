//! Rendering boundary: a guard shows exactly one of four things.

use serde::Serialize;

use crate::area::DeactivationNotice;
use crate::state::{GuardState, Redirect};

/// What to render, with the protected subtree borrowed from the guard.
#[derive(Debug, PartialEq, Eq)]
pub enum View<'a, C> {
    /// Neutral loading indicator.
    Loading,
    /// Navigate away, replacing the history entry.
    Redirect(Redirect),
    /// The protected children.
    Protected(&'a C),
    /// Static message; no redirect, no retry.
    Message(DeactivationNotice),
}

impl<'a, C> View<'a, C> {
    pub fn of(state: &GuardState, children: &'a C) -> Self {
        match state {
            GuardState::Pending => View::Loading,
            GuardState::Authorized => View::Protected(children),
            GuardState::UnauthorizedNoSession { redirect } | GuardState::UnauthorizedWrongRole { redirect } => {
                View::Redirect(redirect.clone())
            }
            GuardState::Deactivated { notice } => View::Message(notice.clone()),
        }
    }
}

/// Serializable form of [`View`] for callers across a process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    Loading,
    Redirect { to: String, replace: bool },
    Protected,
    Message { title: String, body: String },
}

impl From<&GuardState> for Decision {
    fn from(state: &GuardState) -> Self {
        match View::of(state, &()) {
            View::Loading => Decision::Loading,
            View::Redirect(Redirect { to, replace }) => Decision::Redirect { to, replace },
            View::Protected(_) => Decision::Protected,
            View::Message(DeactivationNotice { title, body }) => Decision::Message { title, body },
        }
    }
}
