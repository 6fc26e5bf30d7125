use axum::{routing::get, Router};

pub mod analysis;
pub mod system;

/// Router for all engine-backed endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/providers", get(system::providers))
        .nest("/analysis", analysis::router())
}
