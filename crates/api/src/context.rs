use gatehouse_auth::Session;

/// Session context for a request.
///
/// Always present on guarded routes; `None` means the request carried no
/// usable bearer token.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    session: Option<Session>,
}

impl SessionContext {
    pub fn new(session: Option<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn into_session(self) -> Option<Session> {
        self.session
    }
}
