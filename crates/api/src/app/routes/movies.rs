use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use movierent_catalog::MovieFilter;
use movierent_core::{MovieId, UserId};

use crate::app::dto::{self, AverageRatingResponse, CategoryResponse, MovieResponse, RatingResponse};
use crate::app::errors;
use crate::app::routes::common::{respond, respond_list};
use crate::app::routes::images;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Public catalog routes.
pub fn public_router() -> Router {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/available", get(available_movies))
        .route("/movies/images/:image_id", get(images::get_image))
        .route("/movies/:id", get(get_movie))
        .route("/movies/:id/ratings", get(movie_ratings))
        .route("/movies/:id/ratings/average", get(average_rating))
        .route("/categories", get(list_categories))
}

/// Catalog routes that need a signed-in user.
pub fn router() -> Router {
    Router::new().route("/movies/:id/ratings", axum::routing::post(rate_movie))
}

pub async fn list_movies(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::MovieQuery>,
) -> axum::response::Response {
    let filter = MovieFilter::from(query);
    respond_list::<_, MovieResponse>(services.list_movies(&filter).await)
}

pub async fn available_movies(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    respond_list::<_, MovieResponse>(services.available_movies().await)
}

pub async fn get_movie(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovieId = match dto::parse_id(&id, "movie") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond::<_, MovieResponse>(StatusCode::OK, services.get_movie(id).await)
}

pub async fn movie_ratings(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovieId = match dto::parse_id(&id, "movie") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond_list::<_, RatingResponse>(services.movie_ratings(id).await)
}

pub async fn average_rating(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovieId = match dto::parse_id(&id, "movie") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.movie_rating_summary(id).await {
        Ok((average, count)) => Json(AverageRatingResponse {
            movie_id: id.to_string(),
            average_rating: average.unwrap_or(0.0),
            rating_count: count,
        })
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn rate_movie(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RateMovieRequest>,
) -> axum::response::Response {
    let id: MovieId = match dto::parse_id(&id, "movie") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let user_id: Option<UserId> = match dto::parse_optional_id(body.user_id.as_deref(), "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    respond::<_, RatingResponse>(
        StatusCode::CREATED,
        services.rate_movie(&principal, id, user_id, body.rating).await,
    )
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    respond_list::<_, CategoryResponse>(services.list_categories().await)
}
