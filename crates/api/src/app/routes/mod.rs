use axum::{Router, routing::get};

pub mod guard;
pub mod system;

/// Router for the guard endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/areas", get(system::areas))
        .route("/guard/:area", get(guard::evaluate))
}
