use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use implodesc_engine::AnalysisEngine;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/start", post(start_analysis))
        .route("/clarify", post(submit_clarifications))
        .route("/:id/status", get(get_status))
        .route("/:id/result", get(get_result))
        .route("/:id/credentials", post(set_credentials))
}

pub async fn start_analysis(
    Extension(engine): Extension<Arc<AnalysisEngine>>,
    Json(body): Json<dto::StartAnalysisRequest>,
) -> axum::response::Response {
    let query = body.query;
    tracing::info!(item_name = %query.item_name, "start analysis requested");

    match engine.start_analysis(
        &query.item_name,
        query.description.as_deref(),
        query.quantity.unwrap_or(1),
    ) {
        Ok(started) => (
            StatusCode::OK,
            Json(dto::StartAnalysisResponse::from(started)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn submit_clarifications(
    Extension(engine): Extension<Arc<AnalysisEngine>>,
    Json(body): Json<dto::SubmitClarificationsRequest>,
) -> axum::response::Response {
    let session_id = match errors::parse_session_id(&body.session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    tracing::info!(
        session_id = %session_id,
        clarifications = body.clarifications.len(),
        "clarifications received"
    );

    match engine.submit_clarifications(session_id, body.clarifications).await {
        Ok(submitted) => Json(dto::SubmitClarificationsResponse::from(submitted)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_status(
    Extension(engine): Extension<Arc<AnalysisEngine>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let session_id = match errors::parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match engine.get_status(session_id) {
        Ok(status) => Json(status).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_result(
    Extension(engine): Extension<Arc<AnalysisEngine>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let session_id = match errors::parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match engine.get_result(session_id) {
        Ok(result) => Json(result).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn set_credentials(
    Extension(engine): Extension<Arc<AnalysisEngine>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetCredentialsRequest>,
) -> axum::response::Response {
    let session_id = match errors::parse_session_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match engine.set_credentials(session_id, &body.api_keys) {
        Ok(accepted) => {
            let message = if accepted.is_empty() {
                "No valid API keys were provided".to_string()
            } else {
                format!("{} API key(s) stored for this session", accepted.len())
            };
            Json(dto::SetCredentialsResponse {
                session_id,
                accepted,
                message,
            })
            .into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
