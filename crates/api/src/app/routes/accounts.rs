use std::sync::Arc;

use axum::{Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::post};

use crate::app::dto::{self, LoginResponse, UserResponse};
use crate::app::errors;
use crate::app::routes::common::respond;
use crate::app::services::AppServices;

/// Public account routes.
pub fn router() -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let (cmd, password) = body.into_parts();
    respond::<_, UserResponse>(StatusCode::CREATED, services.register(cmd, password).await)
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services.login(&body.email, body.password).await {
        Ok((token, user)) => Json(LoginResponse {
            token,
            token_type: "Bearer",
            user: user.into(),
        })
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
