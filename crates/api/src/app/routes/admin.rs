//! Admin routes: catalog management and the rental desk.
//!
//! Every handler is behind the auth middleware; the services reject callers
//! without the admin role with 403.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};

use movierent_core::{MovieId, RentalId};
use movierent_rentals::RentalStatus;

use crate::app::dto::{self, MovieResponse, RentalResponse};
use crate::app::errors;
use crate::app::routes::common::{respond, respond_list};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/admin/movies", post(create_movie))
        .route("/admin/movies/:id", put(update_movie).delete(delete_movie))
        .route("/admin/movies/:id/rentals", get(movie_rentals))
        .route("/admin/rentals", get(list_rentals))
        .route("/admin/rentals/ordered", get(ordered_rentals))
        .route("/admin/rentals/taken", get(taken_rentals))
        .route("/admin/rentals/:id/take", patch(take_rental))
        .route("/admin/rentals/:id/return", patch(return_rental))
}

// ─────────────────────────────────────────────────────────────────────────────
// Movies
// ─────────────────────────────────────────────────────────────────────────────

pub async fn create_movie(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::MovieRequest>,
) -> axum::response::Response {
    respond::<_, MovieResponse>(StatusCode::CREATED, services.create_movie(&principal, body.into()).await)
}

pub async fn update_movie(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::MovieRequest>,
) -> axum::response::Response {
    let id: MovieId = match dto::parse_id(&id, "movie") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond::<_, MovieResponse>(StatusCode::OK, services.update_movie(&principal, id, body.into()).await)
}

pub async fn delete_movie(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovieId = match dto::parse_id(&id, "movie") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.delete_movie(&principal, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn movie_rentals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovieId = match dto::parse_id(&id, "movie") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond_list::<_, RentalResponse>(services.movie_rentals(&principal, id).await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Rentals
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_rentals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AdminRentalsQuery>,
) -> axum::response::Response {
    let status = match dto::parse_status(query.status.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond_list::<_, RentalResponse>(
        services
            .admin_rentals(&principal, query.email.as_deref(), status)
            .await,
    )
}

pub async fn ordered_rentals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    respond_list::<_, RentalResponse>(
        services
            .admin_rentals(&principal, None, Some(RentalStatus::Ordered))
            .await,
    )
}

pub async fn taken_rentals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    respond_list::<_, RentalResponse>(
        services
            .admin_rentals(&principal, None, Some(RentalStatus::Taken))
            .await,
    )
}

pub async fn take_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RentalId = match dto::parse_id(&id, "rental") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond::<_, RentalResponse>(StatusCode::OK, services.take_rental(&principal, id).await)
}

pub async fn return_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RentalId = match dto::parse_id(&id, "rental") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond::<_, RentalResponse>(StatusCode::OK, services.return_rental(&principal, id).await)
}
