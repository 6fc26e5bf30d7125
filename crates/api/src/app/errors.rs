use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use implodesc_core::{DomainError, SessionId};

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::InvalidInput(_) => json_error(StatusCode::BAD_REQUEST, "invalid_input", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::NotReady { .. } => json_error(StatusCode::CONFLICT, "not_ready", message),
        DomainError::AlreadySubmitted { .. } => {
            json_error(StatusCode::CONFLICT, "already_submitted", message)
        }
        DomainError::ResultMissing
        | DomainError::InvariantViolation(_)
        | DomainError::ProviderUnavailable(_)
        | DomainError::ProviderFailure(_) => {
            tracing::error!(error = %message, "request failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_session_id(s: &str) -> Result<SessionId, axum::response::Response> {
    s.parse::<SessionId>().map_err(domain_error_to_response)
}
