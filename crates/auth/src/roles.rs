use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Site-wide role identifier (e.g. `"admin"`, `"apartments_editor"`).
///
/// Roles are opaque, case-sensitive strings; the data store holds one row per
/// (user, role) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role::from_static("admin");
    pub const EDITOR: Role = Role::from_static("editor");
    pub const APARTMENTS_EDITOR: Role = Role::from_static("apartments_editor");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

/// True if `held` contains at least one of `any_of` (OR semantics).
pub fn grants_any(held: impl IntoIterator<Item = impl AsRef<str>>, any_of: &[Role]) -> bool {
    held.into_iter()
        .any(|h| any_of.iter().any(|r| r.as_str() == h.as_ref()))
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
