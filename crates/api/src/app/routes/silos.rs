use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use silos_core::SiloId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_silos).post(create_silo))
        .route("/:id", get(get_silo).patch(rename_silo).delete(delete_silo))
        .route("/:id/load", post(load))
        .route("/:id/unload", post(unload))
}

fn parse_id(raw: &str) -> Result<SiloId, axum::response::Response> {
    raw.parse::<SiloId>()
        .map_err(errors::domain_error_to_response)
}

pub async fn list_silos(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.registry.list().await {
        Ok(silos) => {
            let body: Vec<dto::SiloResponse> = silos.iter().map(dto::SiloResponse::from).collect();
            Json(body).into_response()
        }
        Err(e) => errors::silo_error_to_response(e),
    }
}

pub async fn get_silo(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.registry.get(id).await {
        Ok(silo) => Json(dto::SiloResponse::from(&silo)).into_response(),
        Err(e) => errors::silo_error_to_response(e),
    }
}

pub async fn create_silo(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateSiloRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.registry.create(&body.name).await {
        Ok(silo) => (StatusCode::CREATED, Json(dto::SiloResponse::from(&silo))).into_response(),
        Err(e) => errors::silo_error_to_response(e),
    }
}

pub async fn rename_silo(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::RenameSiloRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.registry.rename(id, &body.name).await {
        Ok(silo) => Json(dto::SiloResponse::from(&silo)).into_response(),
        Err(e) => errors::silo_error_to_response(e),
    }
}

pub async fn delete_silo(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.registry.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::silo_error_to_response(e),
    }
}

pub async fn load(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::LoadRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .ledger
        .load(id, body.amount, body.cereal.as_deref())
        .await
    {
        Ok(movement) => (StatusCode::CREATED, Json(dto::MovementResponse::from(movement))).into_response(),
        Err(e) => errors::silo_error_to_response(e),
    }
}

pub async fn unload(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UnloadRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.ledger.unload(id, body.amount).await {
        Ok(movement) => (StatusCode::CREATED, Json(dto::MovementResponse::from(movement))).into_response(),
        Err(e) => errors::silo_error_to_response(e),
    }
}
