use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn get_summary(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.reporter.summary().await {
        Ok(lines) => Json(lines).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
