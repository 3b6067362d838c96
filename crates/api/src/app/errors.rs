use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use docgate_core::DomainError;
use docgate_infra::IngestionError;

use crate::app::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid credentials")
        }
        ServiceError::Ingestion(IngestionError::DuplicateDocument(id)) => json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("document {id} already has an ingestion"),
        ),
        ServiceError::Ingestion(IngestionError::WorkerUnavailable) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "unavailable",
            "ingestion worker unavailable",
        ),
        ServiceError::Storage(e) => {
            tracing::error!(error = %e, "file storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "failed to store file",
            )
        }
        ServiceError::Token(e) => {
            tracing::error!(error = %e, "token issuance failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                "failed to issue token",
            )
        }
        ServiceError::Password(e) => {
            tracing::error!(error = %e, "password hashing failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        e @ DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        service_error_to_response(self)
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
