use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, patch, post},
};

use movierent_core::{MovieId, RentalId, UserId};

use crate::app::dto::{self, RentalResponse};
use crate::app::routes::common::respond;
use crate::app::services::{AppServices, NewRental};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/rentals", post(create_rental))
        .route("/rentals/code/:code", get(rental_by_code))
        .route("/rentals/:id", get(get_rental))
        .route("/rentals/:id/cancel", patch(cancel_rental))
}

pub async fn create_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateRentalRequest>,
) -> axum::response::Response {
    let movie_id: MovieId = match dto::parse_id(&body.movie_id, "movie") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let user_id: Option<UserId> = match dto::parse_optional_id(body.user_id.as_deref(), "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let req = NewRental {
        movie_id,
        user_id,
        rental_date: body.rental_date,
        return_date: body.return_date,
    };
    respond::<_, RentalResponse>(StatusCode::CREATED, services.create_rental(&principal, req).await)
}

pub async fn get_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RentalId = match dto::parse_id(&id, "rental") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond::<_, RentalResponse>(StatusCode::OK, services.get_rental(&principal, id).await)
}

pub async fn rental_by_code(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(code): Path<String>,
) -> axum::response::Response {
    respond::<_, RentalResponse>(StatusCode::OK, services.rental_by_code(&principal, &code).await)
}

pub async fn cancel_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RentalId = match dto::parse_id(&id, "rental") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond::<_, RentalResponse>(StatusCode::OK, services.cancel_rental(&principal, id).await)
}
