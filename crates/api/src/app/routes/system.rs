use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use implodesc_engine::AnalysisEngine;

use crate::app::{dto, errors};

pub async fn health() -> Json<dto::HealthResponse> {
    Json(dto::HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn providers(
    Extension(engine): Extension<Arc<AnalysisEngine>>,
    Query(query): Query<dto::ProvidersQuery>,
) -> axum::response::Response {
    let session_id = match query.session_id.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => match errors::parse_session_id(raw) {
            Ok(id) => Some(id),
            Err(response) => return response,
        },
        None => None,
    };

    Json(engine.available_providers(session_id)).into_response()
}
