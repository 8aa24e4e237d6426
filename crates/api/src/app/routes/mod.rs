use axum::{Router, routing::get};

pub mod accounts;
pub mod admin;
pub mod common;
pub mod images;
pub mod movies;
pub mod rentals;
pub mod system;
pub mod users;

/// Router for endpoints anyone may call.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .merge(accounts::router())
        .merge(movies::public_router())
        .merge(images::public_router())
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(movies::router())
        .merge(rentals::router())
        .merge(users::router())
        .merge(images::router())
        .merge(admin::router())
}
