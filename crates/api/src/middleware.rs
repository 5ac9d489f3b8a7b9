use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use gatehouse_auth::Session;

use crate::context::SessionContext;
use crate::token::JwtValidator;

pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Attach a [`SessionContext`] to every request.
///
/// Never rejects: a missing, malformed or expired token is simply "no
/// session", and the guard decides where to send the visitor.
pub async fn session_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let session = extract_bearer(req.headers()).and_then(|token| {
        match state.jwt.validate(token, Utc::now()) {
            Ok(claims) => Some(Session::from_verified_claims(&claims, token)),
            Err(e) => {
                tracing::debug!(error = %e, "bearer token rejected; treating as signed out");
                None
            }
        }
    });

    req.extensions_mut().insert(SessionContext::new(session));
    next.run(req).await
}

/// Permissive CORS; preflight requests are answered here without reaching a
/// handler.
pub async fn cors_middleware(req: Request, next: Next) -> Response {
    let mut res = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = res.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    res
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
