//! `gatehouse-auth` — session-gated route authorization.
//!
//! One generic guard engine parameterized by per-area tables:
//!
//! ```text
//! SessionSource ──► GuardEngine ──► RoleResolver ──► DirectoryStore
//!       │               │
//!       └─ changes ──► RouteGuard (GuardMachine + watcher) ──► View
//! ```
//!
//! This crate is decoupled from HTTP and from any concrete store; adapters live
//! in `gatehouse-infra`.

pub mod area;
pub mod claims;
pub mod directory;
pub mod engine;
pub mod error;
pub mod facts;
pub mod guard;
pub mod profiles;
pub mod render;
pub mod resolver;
pub mod roles;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use area::{AreaConfig, AreaRegistry, DeactivationNotice, DenialPolicy, Requirement};
pub use claims::{ClaimsError, SessionClaims, validate_claims};
pub use directory::{DirectoryAdmin, DirectoryStore, StoreError};
pub use engine::{GuardContext, GuardEngine, Verdict};
pub use error::GuardError;
pub use facts::{AuthorizationFact, SiteRoleSet, assess};
pub use guard::RouteGuard;
pub use profiles::{AgentProfile, PortalProfile, PortalRole};
pub use render::{Decision, View};
pub use resolver::{DirectoryRoleResolver, RoleResolver, TimeoutResolver};
pub use roles::Role;
pub use session::{
    AuthChangeEvent, IdentityProvider, ProviderError, ProviderSessionSource, Session, SessionChange,
    SessionSource, StaticSessionSource,
};
pub use state::{Generation, GuardMachine, GuardState, Redirect, SettleRejected};
