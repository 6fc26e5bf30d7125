//! HTTP application wiring (Axum router).
//!
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and their mapping from engine views
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use implodesc_engine::AnalysisEngine;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(engine: Arc<AnalysisEngine>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(engine)))
}
