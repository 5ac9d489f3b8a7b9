//! The guard pipeline: session → authorization fact → state.

use std::sync::Arc;

use gatehouse_core::SubjectId;

use crate::area::AreaConfig;
use crate::error::GuardError;
use crate::facts::assess;
use crate::resolver::RoleResolver;
use crate::session::SessionSource;
use crate::state::GuardState;

/// Shared collaborators handed to every guard.
///
/// The session source is read-only from here; nothing in a guard signs anyone
/// in or out.
#[derive(Clone)]
pub struct GuardContext {
    sessions: Arc<dyn SessionSource>,
    resolver: Arc<dyn RoleResolver>,
}

impl GuardContext {
    pub fn new(sessions: Arc<dyn SessionSource>, resolver: Arc<dyn RoleResolver>) -> Self {
        Self { sessions, resolver }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionSource> {
        &self.sessions
    }

    pub fn resolver(&self) -> &Arc<dyn RoleResolver> {
        &self.resolver
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub state: GuardState,
    /// Subject of the session evaluated, if there was one.
    pub subject: Option<SubjectId>,
    /// Why access was denied; `None` when authorized.
    pub cause: Option<GuardError>,
}

/// Stateless evaluation for one area. Mounted guards and one-shot callers
/// (HTTP) share it.
#[derive(Clone)]
pub struct GuardEngine {
    area: Arc<AreaConfig>,
    context: GuardContext,
}

impl GuardEngine {
    pub fn new(area: Arc<AreaConfig>, context: GuardContext) -> Self {
        Self { area, context }
    }

    pub fn area(&self) -> &AreaConfig {
        &self.area
    }

    pub fn context(&self) -> &GuardContext {
        &self.context
    }

    /// Run the pipeline once against the current session.
    ///
    /// Never fails: lookups that error out are logged and deny access.
    pub async fn evaluate(&self) -> Verdict {
        let Some(session) = self.context.sessions.current_session().await else {
            // No role lookup without a session.
            return self.conclude(None, Err(GuardError::NoSession));
        };

        let subject = session.subject_id();
        let requirement = &self.area.requirement;

        let resolution = match self.context.resolver.resolve(subject, requirement).await {
            Ok(fact) => assess(fact.as_ref(), requirement),
            Err(e) => {
                tracing::warn!(
                    area = %self.area.name,
                    subject_id = %subject,
                    error = %e,
                    "authorization lookup failed; denying access"
                );
                Err(GuardError::BackendUnavailable(e.to_string()))
            }
        };

        self.conclude(Some(subject), resolution)
    }

    fn conclude(&self, subject: Option<SubjectId>, resolution: Result<(), GuardError>) -> Verdict {
        let state = GuardState::from_resolution(&self.area, &resolution);
        tracing::debug!(
            area = %self.area.name,
            subject_id = ?subject,
            state = state.label(),
            "guard evaluated"
        );
        Verdict {
            state,
            subject,
            cause: resolution.err(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::AreaRegistry;
    use crate::profiles::{AgentProfile, PortalProfile, PortalRole};
    use crate::state::Redirect;
    use crate::testing::{CountingResolver, TestDirectory, TestSessions, context, resolver_for};
    use proptest::prelude::*;

    fn engine(area: AreaConfig, sessions: Arc<TestSessions>, directory: TestDirectory) -> GuardEngine {
        let resolver = Arc::new(resolver_for(Arc::new(directory)));
        GuardEngine::new(Arc::new(area), context(sessions, resolver))
    }

    #[tokio::test]
    async fn editor_is_sent_to_apartments_login() {
        let subject = SubjectId::new();
        let engine = engine(
            AreaConfig::apartments_admin(),
            TestSessions::signed_in(subject),
            TestDirectory::default().with_roles(subject, &["editor"]),
        );

        let verdict = engine.evaluate().await;
        assert_eq!(
            verdict.state,
            GuardState::UnauthorizedNoSession {
                redirect: Redirect::replace("/apartments/login")
            }
        );
        assert_eq!(verdict.cause, Some(GuardError::NoAuthorizationFact));
    }

    #[tokio::test]
    async fn apartments_editor_is_let_in() {
        let subject = SubjectId::new();
        let engine = engine(
            AreaConfig::apartments_admin(),
            TestSessions::signed_in(subject),
            TestDirectory::default().with_roles(subject, &["editor", "apartments_editor"]),
        );
        assert_eq!(engine.evaluate().await.state, GuardState::Authorized);
    }

    #[tokio::test]
    async fn inactive_agent_sees_the_deactivation_message() {
        let subject = SubjectId::new();
        let engine = engine(
            AreaConfig::crm_agent(),
            TestSessions::signed_in(subject),
            TestDirectory::default().with_agent(AgentProfile::new(subject, "Dana").deactivated()),
        );

        let verdict = engine.evaluate().await;
        assert!(verdict.state.redirect().is_none());
        match verdict.state {
            GuardState::Deactivated { notice } => assert_eq!(notice.title, "Account Deactivated"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn advisor_on_client_pages_goes_to_their_own_dashboard() {
        let subject = SubjectId::new();
        let engine = engine(
            AreaConfig::portal_client(),
            TestSessions::signed_in(subject),
            TestDirectory::default().with_portal(PortalProfile::new(subject, "Noa", PortalRole::ADVISOR)),
        );

        let verdict = engine.evaluate().await;
        assert_eq!(
            verdict.state,
            GuardState::UnauthorizedWrongRole {
                redirect: Redirect::replace("/portal/advisor/dashboard")
            }
        );
    }

    #[tokio::test]
    async fn portal_visitor_without_profile_gets_login_with_marker() {
        let engine = engine(
            AreaConfig::portal_client(),
            TestSessions::signed_in(SubjectId::new()),
            TestDirectory::default(),
        );
        assert_eq!(
            engine.evaluate().await.state.redirect().map(|r| r.to.clone()),
            Some("/portal/login?error=unauthorized".to_string())
        );
    }

    #[tokio::test]
    async fn any_portal_role_is_enough_for_shared_pages() {
        let subject = SubjectId::new();
        let engine = engine(
            AreaConfig::portal_any(),
            TestSessions::signed_in(subject),
            TestDirectory::default().with_portal(PortalProfile::new(subject, "Noa", PortalRole::ADVISOR)),
        );
        assert_eq!(engine.evaluate().await.state, GuardState::Authorized);
    }

    #[tokio::test]
    async fn no_session_never_reaches_the_resolver() {
        let registry = AreaRegistry::presets();
        for name in registry.names() {
            let area = registry.get(name).unwrap();
            let resolver = Arc::new(CountingResolver::new(resolver_for(Arc::new(TestDirectory::default()))));
            let engine = GuardEngine::new(area.clone(), context(TestSessions::signed_out(), resolver.clone()));

            let verdict = engine.evaluate().await;
            assert_eq!(
                verdict.state,
                GuardState::UnauthorizedNoSession {
                    redirect: Redirect::replace(area.login_route.clone())
                },
                "{name}"
            );
            assert_eq!(resolver.calls(), 0, "{name}");
        }
    }

    #[tokio::test]
    async fn backend_outage_fails_closed() {
        let subject = SubjectId::new();
        let directory = TestDirectory::default().with_roles(subject, &["admin"]);
        directory.set_down(true);
        let engine = engine(AreaConfig::apartments_admin(), TestSessions::signed_in(subject), directory);

        let verdict = engine.evaluate().await;
        assert!(!verdict.state.is_authorized());
        assert_eq!(verdict.state.label(), "unauthorized_no_session");
        assert!(matches!(verdict.cause, Some(GuardError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn repeated_evaluation_is_idempotent() {
        let subject = SubjectId::new();
        let engine = engine(
            AreaConfig::portal_client(),
            TestSessions::signed_in(subject),
            TestDirectory::default().with_portal(PortalProfile::new(subject, "Noa", PortalRole::CLIENT)),
        );
        let first = engine.evaluate().await;
        let second = engine.evaluate().await;
        assert_eq!(first, second);
        assert_eq!(first.state, GuardState::Authorized);
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    fn area_strategy() -> impl Strategy<Value = AreaConfig> {
        prop_oneof![
            Just(AreaConfig::apartments_admin()),
            Just(AreaConfig::site_admin()),
            Just(AreaConfig::crm_agent()),
            Just(AreaConfig::portal_client()),
            Just(AreaConfig::portal_advisor()),
            Just(AreaConfig::portal_any()),
        ]
    }

    fn portal_role_strategy() -> impl Strategy<Value = PortalRole> {
        prop_oneof![
            Just(PortalRole::CLIENT),
            Just(PortalRole::ADVISOR),
            Just(PortalRole::ADMIN),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: whatever facts exist, no session never renders children.
        #[test]
        fn signed_out_visitors_are_always_sent_to_login(
            area in area_strategy(),
            role in portal_role_strategy(),
            active in any::<bool>(),
        ) {
            let subject = SubjectId::new();
            let mut portal = PortalProfile::new(subject, "x", role);
            portal.is_active = active;
            let directory = TestDirectory::default()
                .with_roles(subject, &["admin", "apartments_editor", "editor"])
                .with_agent(AgentProfile::new(subject, "x"))
                .with_portal(portal);
            let login = area.login_route.clone();
            let engine = engine(area, TestSessions::signed_out(), directory);

            let verdict = block_on(engine.evaluate());
            prop_assert_eq!(
                verdict.state,
                GuardState::UnauthorizedNoSession { redirect: Redirect::replace(login) }
            );
        }

        /// Property: an inactive portal profile is deactivated whatever its role.
        #[test]
        fn inactive_portal_profiles_are_deactivated_regardless_of_role(
            role in portal_role_strategy(),
            area in prop_oneof![
                Just(AreaConfig::portal_client()),
                Just(AreaConfig::portal_advisor()),
                Just(AreaConfig::portal_any()),
            ],
        ) {
            let subject = SubjectId::new();
            let directory = TestDirectory::default()
                .with_portal(PortalProfile::new(subject, "x", role).deactivated());
            let engine = engine(area, TestSessions::signed_in(subject), directory);

            let verdict = block_on(engine.evaluate());
            prop_assert_eq!(verdict.state.label(), "deactivated");
            prop_assert!(verdict.state.redirect().is_none());
        }

        /// Property: site-role areas authorize iff the subject holds any required role.
        #[test]
        fn site_roles_authorize_on_any_overlap(
            held in prop::collection::vec(
                prop_oneof![Just("admin"), Just("editor"), Just("apartments_editor"), Just("viewer")],
                0..4,
            ),
        ) {
            let subject = SubjectId::new();
            let expected = held.iter().any(|r| *r == "admin" || *r == "apartments_editor");
            let directory = TestDirectory::default().with_roles(subject, &held);
            let engine = engine(AreaConfig::apartments_admin(), TestSessions::signed_in(subject), directory);

            let verdict = block_on(engine.evaluate());
            prop_assert_eq!(verdict.state.is_authorized(), expected);
        }
    }
}
