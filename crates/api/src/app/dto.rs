use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use movierent_accounts::{RegisterUser, UpdateProfile, User};
use movierent_catalog::{Category, MovieDraft, MovieFilter, Rating};
use movierent_rentals::RentalStatus;

use crate::app::errors;
use crate::app::services::{MovieInput, MovieView, RatingView, RentalView};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl RegisterRequest {
    pub fn into_parts(self) -> (RegisterUser, String) {
        (
            RegisterUser {
                email: self.email,
                full_name: self.full_name,
                phone_number: self.phone_number,
                address: self.address,
            },
            self.password,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl From<UpdateUserRequest> for UpdateProfile {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            full_name: req.full_name,
            phone_number: req.phone_number,
            address: req.address,
        }
    }
}

/// Create/update body for admin movie routes.
#[derive(Debug, Deserialize)]
pub struct MovieRequest {
    pub title: String,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub director: Option<String>,
    #[serde(alias = "duration")]
    pub duration_minutes: Option<i32>,
    pub image_id: Option<String>,
    pub actors: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub stock_quantity: i32,
}

impl From<MovieRequest> for MovieInput {
    fn from(req: MovieRequest) -> Self {
        Self {
            draft: MovieDraft {
                title: req.title,
                description: req.description,
                release_year: req.release_year,
                director: req.director,
                duration_minutes: req.duration_minutes,
                image_id: req.image_id.filter(|id| !id.trim().is_empty()),
                stock_quantity: req.stock_quantity,
            },
            actors: req.actors,
            categories: req.categories,
        }
    }
}

/// `GET /movies` query string. `rating` is the minimum average rating.
#[derive(Debug, Default, Deserialize)]
pub struct MovieQuery {
    pub category: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub search: Option<String>,
}

impl From<MovieQuery> for MovieFilter {
    fn from(q: MovieQuery) -> Self {
        Self {
            category: q.category,
            year: q.year,
            min_rating: q.rating,
            search: q.search,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RateMovieRequest {
    pub rating: i32,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRentalRequest {
    pub movie_id: String,
    pub user_id: Option<String>,
    pub rental_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminRentalsQuery {
    pub email: Option<String>,
    pub status: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Public view of a user. The password hash never leaves the service.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_string(),
            is_admin: u.is_admin(),
            email: u.email,
            full_name: u.full_name,
            phone_number: u.phone_number,
            address: u.address,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub director: Option<String>,
    pub duration_minutes: Option<i32>,
    pub image_id: Option<String>,
    pub actors: Vec<String>,
    pub categories: Vec<String>,
    /// 0.0 for unrated movies.
    pub average_rating: f64,
    pub stock_quantity: i32,
    pub available: bool,
}

impl From<MovieView> for MovieResponse {
    fn from(v: MovieView) -> Self {
        let m = v.movie;
        Self {
            id: m.id.to_string(),
            available: m.is_available(),
            title: m.title,
            description: m.description,
            release_year: m.release_year,
            director: m.director,
            duration_minutes: m.duration_minutes,
            image_id: m.image_id,
            actors: m.actors.into_iter().map(|a| a.name).collect(),
            categories: m.categories.into_iter().map(|c| c.name).collect(),
            average_rating: v.average_rating.unwrap_or(0.0),
            stock_quantity: m.stock_quantity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub id: String,
    pub user_id: String,
    pub user_full_name: Option<String>,
    pub movie_id: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Rating> for RatingResponse {
    fn from(r: Rating) -> Self {
        RatingView {
            rating: r,
            user_full_name: None,
        }
        .into()
    }
}

impl From<RatingView> for RatingResponse {
    fn from(v: RatingView) -> Self {
        let r = v.rating;
        Self {
            id: r.id.to_string(),
            user_id: r.user_id.to_string(),
            user_full_name: v.user_full_name,
            movie_id: r.movie_id.to_string(),
            rating: r.score.value(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AverageRatingResponse {
    pub movie_id: String,
    pub average_rating: f64,
    pub rating_count: usize,
}

#[derive(Debug, Serialize)]
pub struct RentalResponse {
    pub id: String,
    pub user_id: String,
    pub user_full_name: Option<String>,
    pub movie_id: String,
    pub movie_title: Option<String>,
    pub rental_code: String,
    pub rental_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: RentalStatus,
}

impl From<RentalView> for RentalResponse {
    fn from(v: RentalView) -> Self {
        let r = v.rental;
        Self {
            id: r.id.to_string(),
            user_id: r.user_id.to_string(),
            user_full_name: v.user_full_name,
            movie_id: r.movie_id.to_string(),
            movie_title: v.movie_title,
            rental_code: r.code.into_string(),
            rental_date: r.rental_date,
            return_date: r.return_date,
            status: r.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub image_id: String,
}

// -------------------------
// Helpers
// -------------------------

/// Parse a path or body identifier, answering 400 on garbage.
pub fn parse_id<T: FromStr>(raw: &str, what: &'static str) -> Result<T, axum::response::Response> {
    raw.trim().parse().map_err(|_| {
        errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}

pub fn parse_optional_id<T: FromStr>(raw: Option<&str>, what: &'static str) -> Result<Option<T>, axum::response::Response> {
    raw.map(|r| parse_id(r, what)).transpose()
}

pub fn parse_status(raw: Option<&str>) -> Result<Option<RentalStatus>, axum::response::Response> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| {
            errors::json_error(
                axum::http::StatusCode::BAD_REQUEST,
                "invalid_status",
                "status must be one of: ORDERED, TAKEN, RETURNED, CANCELLED",
            )
        }),
    }
}

pub fn list<T, U: From<T>>(items: Vec<T>) -> Vec<U> {
    items.into_iter().map(U::from).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use movierent_catalog::Movie;

    use super::*;

    #[test]
    fn unrated_movie_reports_zero_average() {
        let movie = Movie::create(
            MovieDraft {
                title: "Heat".to_string(),
                stock_quantity: 0,
                ..Default::default()
            },
            vec![],
            vec![],
            Utc::now(),
        )
        .unwrap();

        let dto = MovieResponse::from(MovieView {
            movie,
            average_rating: None,
        });
        assert_eq!(dto.average_rating, 0.0);
        assert!(!dto.available);
    }

    #[test]
    fn user_response_has_no_password_hash() {
        let user = User::register(
            RegisterUser {
                email: "a@example.com".to_string(),
                full_name: "A".to_string(),
                phone_number: None,
                address: None,
            },
            "$2b$04$secret".to_string(),
            Utc::now(),
        )
        .unwrap();

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["is_admin"], false);
    }

    #[test]
    fn status_query_is_case_insensitive() {
        assert_eq!(parse_status(Some("taken")).ok().flatten(), Some(RentalStatus::Taken));
        assert!(matches!(parse_status(Some("")), Ok(None)));
        assert!(parse_status(Some("lost")).is_err());
    }
}
