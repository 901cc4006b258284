use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use silos_core::DomainError;
use silos_infra::{SiloError, StoreError};

pub fn silo_error_to_response(err: SiloError) -> axum::response::Response {
    match err {
        SiloError::Domain(e) => domain_error_to_response(e),
        SiloError::Store(e) => store_error_to_response(e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::DuplicateName(_) | DomainError::HasMovements(_) => StatusCode::CONFLICT,
        DomainError::InvalidName(_) | DomainError::InvalidAmount(_) | DomainError::InvalidCereal(_) => {
            StatusCode::BAD_REQUEST
        }
        DomainError::CerealRequired
        | DomainError::CerealMismatch { .. }
        | DomainError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    tracing::warn!(error = err.code(), %err, "request rejected");
    json_error(status, err.code(), err.to_string())
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    tracing::error!(error = %err, "store failure");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "store_error",
        "internal storage error",
    )
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_client_statuses() {
        let cases = [
            (DomainError::NotFound, StatusCode::NOT_FOUND),
            (DomainError::duplicate_name("A"), StatusCode::CONFLICT),
            (DomainError::HasMovements(2), StatusCode::CONFLICT),
            (DomainError::invalid_name("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_amount("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_cereal("x"), StatusCode::BAD_REQUEST),
            (DomainError::CerealRequired, StatusCode::UNPROCESSABLE_ENTITY),
            (
                DomainError::InsufficientStock {
                    requested: 2,
                    available: 1,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn store_errors_are_internal() {
        let res = silo_error_to_response(SiloError::Store(StoreError::Poisoned("silos")));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
