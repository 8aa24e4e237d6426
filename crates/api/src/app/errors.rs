use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use movierent_accounts::{AuthzError, PasswordError, TokenError};
use movierent_core::DomainError;
use movierent_infra::{ImageError, StoreError};

use crate::app::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => store_error_to_response(e),
        ServiceError::Forbidden(e @ AuthzError::Forbidden(_)) => {
            json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
        }
        ServiceError::Forbidden(e @ AuthzError::NotOwner) => json_error(StatusCode::FORBIDDEN, "not_owner", e.to_string()),
        ServiceError::Image(ImageError::Empty) => {
            json_error(StatusCode::BAD_REQUEST, "empty_file", "failed to store empty file")
        }
        ServiceError::Image(e @ ImageError::NotFound(_)) => json_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        ServiceError::Image(e @ ImageError::Io(_)) => internal("image_storage_error", e.to_string()),
        ServiceError::Password(e @ PasswordError::TooShort) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        ServiceError::Password(e @ PasswordError::Hash(_)) => internal("password_error", e.to_string()),
        ServiceError::Token(e @ TokenError::Signing(_)) => internal("token_error", e.to_string()),
        ServiceError::Token(e) => json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string()),
        ServiceError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid email or password")
        }
        ServiceError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        ServiceError::Internal(msg) => internal("internal_error", msg),
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => json_error(StatusCode::CONFLICT, "invalid_state", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Invalid(e) => domain_error_to_response(e),
        StoreError::OutOfStock => json_error(
            StatusCode::CONFLICT,
            "out_of_stock",
            "movie is not available for rental",
        ),
        StoreError::Backend(msg) => internal("store_error", msg),
    }
}

/// 500s keep the detail in the logs, not in the response.
fn internal(code: &'static str, detail: String) -> axum::response::Response {
    error!(code, %detail, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, code, "internal server error")
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
