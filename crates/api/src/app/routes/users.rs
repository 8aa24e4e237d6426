use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};

use movierent_core::UserId;

use crate::app::dto::{self, RatingResponse, RentalResponse, UserResponse};
use crate::app::routes::common::{respond, respond_list};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Profile routes. Non-admins may only reach their own user id.
pub fn router() -> Router {
    Router::new()
        .route("/users/:id", get(get_user).put(update_user))
        .route("/users/:id/rentals", get(user_rentals))
        .route("/users/:id/ratings", get(user_ratings))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match dto::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond::<_, UserResponse>(StatusCode::OK, services.get_user(&principal, id).await)
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> axum::response::Response {
    let id: UserId = match dto::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond::<_, UserResponse>(StatusCode::OK, services.update_user(&principal, id, body.into()).await)
}

pub async fn user_rentals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match dto::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond_list::<_, RentalResponse>(services.user_rentals(&principal, id).await)
}

pub async fn user_ratings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match dto::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond_list::<_, RatingResponse>(services.user_ratings(&principal, id).await)
}
