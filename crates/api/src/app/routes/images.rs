use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension, Multipart, Path},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use tracing::warn;

use crate::app::dto::ImageUploadResponse;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Largest accepted poster upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn public_router() -> Router {
    Router::new().route("/images/:image_id", get(get_image))
}

/// Admin-only image management.
pub fn router() -> Router {
    Router::new()
        .route(
            "/admin/images",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/images/:image_id", delete(delete_image))
}

pub async fn get_image(
    Extension(services): Extension<Arc<AppServices>>,
    Path(image_id): Path<String>,
) -> axum::response::Response {
    match services.get_image(&image_id).await {
        Ok(image) => ([(header::CONTENT_TYPE, image.content_type)], image.bytes).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Multipart upload; the file goes in the `file` field.
pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    mut multipart: Multipart,
) -> axum::response::Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed multipart upload");
                return errors::json_error(StatusCode::BAD_REQUEST, "invalid_multipart", e.to_string());
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_multipart", e.to_string()),
        };

        return match services.upload_image(&principal, filename.as_deref(), &bytes).await {
            Ok(image_id) => (StatusCode::CREATED, Json(ImageUploadResponse { image_id })).into_response(),
            Err(e) => errors::service_error_to_response(e),
        };
    }

    errors::json_error(StatusCode::BAD_REQUEST, "missing_file", "multipart field 'file' is required")
}

pub async fn delete_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(image_id): Path<String>,
) -> axum::response::Response {
    match services.delete_image(&principal, &image_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
