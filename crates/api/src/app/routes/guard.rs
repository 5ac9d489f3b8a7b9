use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use gatehouse_auth::{Decision, GuardContext, GuardEngine, StaticSessionSource};

use crate::app::dto::GuardResponse;
use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::context::SessionContext;

/// Evaluate one area for the caller's session and return the render decision.
///
/// Denials are successful responses carrying a redirect or message; only an
/// unknown area is an HTTP error.
pub async fn evaluate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(area): Path<String>,
) -> Response {
    let Some(config) = services.areas().get(&area) else {
        return json_error(StatusCode::NOT_FOUND, format!("unknown area '{area}'"));
    };

    let sessions = Arc::new(StaticSessionSource::new(session.into_session()));
    let engine = GuardEngine::new(config, GuardContext::new(sessions, services.resolver()));
    let verdict = engine.evaluate().await;

    tracing::info!(
        area = %area,
        subject_id = ?verdict.subject,
        state = verdict.state.label(),
        "guard decision"
    );

    Json(GuardResponse {
        state: verdict.state.label(),
        view: Decision::from(&verdict.state),
        area,
    })
    .into_response()
}
