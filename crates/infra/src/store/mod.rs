//! Storage traits for users, the catalog, ratings and rentals.
//!
//! The API holds an `Arc<dyn Store>` and never knows which backend it talks
//! to. Operations that must move stock and rental status together
//! ([`RentalStore::create_rental`], [`RentalStore::apply_transition`]) are
//! atomic in every backend.

pub mod in_memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use movierent_accounts::User;
use movierent_catalog::{Actor, Category, Movie, Rating, RatingScore};
use movierent_core::{DomainError, MovieId, RentalId, UserId};
use movierent_rentals::{Rental, RentalCode, RentalStatus, StockEffect};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("movie is out of stock")]
    OutOfStock,

    /// Input the store refuses to persist (e.g. a blank actor name).
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filter for rental listings. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RentalQuery {
    pub user_id: Option<UserId>,
    pub movie_id: Option<MovieId>,
    pub status: Option<RentalStatus>,
}

impl RentalQuery {
    pub fn matches(&self, rental: &Rental) -> bool {
        self.user_id.is_none_or(|u| rental.user_id == u)
            && self.movie_id.is_none_or(|m| rental.movie_id == m)
            && self.status.is_none_or(|s| rental.status == s)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Duplicate email → [`StoreError::Conflict`].
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// `email` is compared after trim + lowercase.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_user(&self, user: User) -> StoreResult<User>;

    async fn count_users(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_movies(&self) -> StoreResult<Vec<Movie>>;

    async fn get_movie(&self, id: MovieId) -> StoreResult<Option<Movie>>;

    async fn insert_movie(&self, movie: Movie) -> StoreResult<Movie>;

    async fn update_movie(&self, movie: Movie) -> StoreResult<Movie>;

    /// Removes the movie with its ratings and rentals. Refused with
    /// [`StoreError::Conflict`] while any of its rentals is TAKEN.
    async fn delete_movie(&self, id: MovieId) -> StoreResult<Movie>;

    async fn count_movies(&self) -> StoreResult<u64>;

    /// Exact, case-insensitive name lookup; inserts when absent. A blank
    /// name → [`StoreError::Invalid`].
    async fn find_or_create_actor(&self, name: &str) -> StoreResult<Actor>;

    async fn find_or_create_category(&self, name: &str) -> StoreResult<Category>;

    async fn list_actors(&self) -> StoreResult<Vec<Actor>>;

    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
}

#[async_trait]
pub trait RatingStore: Send + Sync {
    /// One rating per (user, movie): an existing rating keeps its id and
    /// creation time and only takes the new score.
    async fn upsert_rating(
        &self,
        user_id: UserId,
        movie_id: MovieId,
        score: RatingScore,
        now: DateTime<Utc>,
    ) -> StoreResult<Rating>;

    async fn ratings_for_movie(&self, movie_id: MovieId) -> StoreResult<Vec<Rating>>;

    async fn ratings_by_user(&self, user_id: UserId) -> StoreResult<Vec<Rating>>;

    /// Average score per rated movie. Unrated movies are absent.
    async fn average_ratings(&self) -> StoreResult<HashMap<MovieId, f64>>;
}

#[async_trait]
pub trait RentalStore: Send + Sync {
    /// Atomically: check the movie has stock (else [`StoreError::OutOfStock`]),
    /// decrement it and insert the rental. A taken code →
    /// [`StoreError::Conflict`].
    async fn create_rental(&self, rental: Rental) -> StoreResult<Rental>;

    async fn get_rental(&self, id: RentalId) -> StoreResult<Option<Rental>>;

    async fn find_rental_by_code(&self, code: &RentalCode) -> StoreResult<Option<Rental>>;

    async fn rental_code_exists(&self, code: &RentalCode) -> StoreResult<bool>;

    /// Newest `rental_date` first.
    async fn list_rentals(&self, query: RentalQuery) -> StoreResult<Vec<Rental>>;

    /// Persist an already-transitioned rental and its stock effect in one
    /// step. Fails with [`StoreError::Conflict`] when the stored status is no
    /// longer `from`, so a concurrent transition never double-restocks.
    async fn apply_transition(&self, rental: &Rental, from: RentalStatus, effect: StockEffect) -> StoreResult<Rental>;
}

/// Everything the API needs from persistence.
pub trait Store: UserStore + CatalogStore + RatingStore + RentalStore {}

impl<T> Store for T where T: UserStore + CatalogStore + RatingStore + RentalStore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rental_query_combines_filters() {
        let user = UserId::new();
        let rental = Rental::order(
            user,
            MovieId::new(),
            RentalCode::parse("AAAA0000").unwrap(),
            None,
            None,
            Utc::now(),
        )
        .unwrap();

        assert!(RentalQuery::default().matches(&rental));
        assert!(
            RentalQuery {
                user_id: Some(user),
                status: Some(RentalStatus::Ordered),
                ..Default::default()
            }
            .matches(&rental)
        );
        assert!(
            !RentalQuery {
                status: Some(RentalStatus::Taken),
                ..Default::default()
            }
            .matches(&rental)
        );
    }
}
