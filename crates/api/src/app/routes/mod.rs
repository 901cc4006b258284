use axum::{routing::get, Router};

pub mod silos;
pub mod summary;
pub mod system;

/// Router for every `/api` endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/summary", get(summary::get_summary))
        .nest("/silos", silos::router())
}
