use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode};

use crate::app::dto::AreasResponse;
use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn areas(Extension(services): Extension<Arc<AppServices>>) -> Json<AreasResponse> {
    Json(AreasResponse {
        areas: services.areas().names().map(str::to_string).collect(),
    })
}
