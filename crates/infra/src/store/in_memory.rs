use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use movierent_accounts::{User, normalize_email};
use movierent_catalog::{Actor, Category, Movie, Rating, RatingScore, average_rating, names_match};
use movierent_core::{MovieId, RentalId, UserId};
use movierent_rentals::{Rental, RentalCode, RentalStatus, StockEffect};

use super::{CatalogStore, RatingStore, RentalQuery, RentalStore, StoreError, StoreResult, UserStore};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    movies: HashMap<MovieId, Movie>,
    actors: Vec<Actor>,
    categories: Vec<Category>,
    ratings: HashMap<(UserId, MovieId), Rating>,
    rentals: HashMap<RentalId, Rental>,
}

/// In-memory store for tests/dev.
///
/// A single lock guards all tables, so compound operations (stock + rental)
/// are trivially atomic. Data is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let Ok(email) = normalize_email(email) else {
            return Ok(None);
        };
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let mut state = self.write()?;
        let slot = state.users.get_mut(&user.id).ok_or(StoreError::NotFound("user"))?;
        *slot = user.clone();
        Ok(user)
    }

    async fn count_users(&self) -> StoreResult<u64> {
        Ok(self.read()?.users.len() as u64)
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let mut movies: Vec<Movie> = self.read()?.movies.values().cloned().collect();
        movies.sort_by_key(|m| (m.created_at, m.id));
        Ok(movies)
    }

    async fn get_movie(&self, id: MovieId) -> StoreResult<Option<Movie>> {
        Ok(self.read()?.movies.get(&id).cloned())
    }

    async fn insert_movie(&self, movie: Movie) -> StoreResult<Movie> {
        let mut state = self.write()?;
        if state.movies.contains_key(&movie.id) {
            return Err(StoreError::Conflict("movie already exists".to_string()));
        }
        state.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn update_movie(&self, movie: Movie) -> StoreResult<Movie> {
        let mut state = self.write()?;
        let slot = state.movies.get_mut(&movie.id).ok_or(StoreError::NotFound("movie"))?;
        *slot = movie.clone();
        Ok(movie)
    }

    async fn delete_movie(&self, id: MovieId) -> StoreResult<Movie> {
        let mut state = self.write()?;
        if !state.movies.contains_key(&id) {
            return Err(StoreError::NotFound("movie"));
        }
        if state
            .rentals
            .values()
            .any(|r| r.movie_id == id && r.status == RentalStatus::Taken)
        {
            return Err(StoreError::Conflict("cannot delete movie with active rentals".to_string()));
        }

        state.ratings.retain(|(_, movie_id), _| *movie_id != id);
        state.rentals.retain(|_, r| r.movie_id != id);
        state.movies.remove(&id).ok_or(StoreError::NotFound("movie"))
    }

    async fn count_movies(&self) -> StoreResult<u64> {
        Ok(self.read()?.movies.len() as u64)
    }

    async fn find_or_create_actor(&self, name: &str) -> StoreResult<Actor> {
        let actor = Actor::new(name)?;
        let mut state = self.write()?;
        if let Some(found) = state.actors.iter().find(|a| names_match(&a.name, &actor.name)) {
            return Ok(found.clone());
        }
        state.actors.push(actor.clone());
        Ok(actor)
    }

    async fn find_or_create_category(&self, name: &str) -> StoreResult<Category> {
        let category = Category::new(name)?;
        let mut state = self.write()?;
        if let Some(found) = state.categories.iter().find(|c| names_match(&c.name, &category.name)) {
            return Ok(found.clone());
        }
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn list_actors(&self) -> StoreResult<Vec<Actor>> {
        let mut actors = self.read()?.actors.clone();
        actors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(actors)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let mut categories = self.read()?.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[async_trait]
impl RatingStore for InMemoryStore {
    async fn upsert_rating(
        &self,
        user_id: UserId,
        movie_id: MovieId,
        score: RatingScore,
        now: DateTime<Utc>,
    ) -> StoreResult<Rating> {
        let mut state = self.write()?;
        if !state.movies.contains_key(&movie_id) {
            return Err(StoreError::NotFound("movie"));
        }
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("user"));
        }

        let rating = state
            .ratings
            .entry((user_id, movie_id))
            .and_modify(|r| r.rescore(score))
            .or_insert_with(|| Rating::new(user_id, movie_id, score, now));
        Ok(rating.clone())
    }

    async fn ratings_for_movie(&self, movie_id: MovieId) -> StoreResult<Vec<Rating>> {
        let mut ratings: Vec<Rating> = self
            .read()?
            .ratings
            .values()
            .filter(|r| r.movie_id == movie_id)
            .cloned()
            .collect();
        ratings.sort_by_key(|r| (r.created_at, r.id));
        Ok(ratings)
    }

    async fn ratings_by_user(&self, user_id: UserId) -> StoreResult<Vec<Rating>> {
        let mut ratings: Vec<Rating> = self
            .read()?
            .ratings
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        ratings.sort_by_key(|r| (r.created_at, r.id));
        Ok(ratings)
    }

    async fn average_ratings(&self) -> StoreResult<HashMap<MovieId, f64>> {
        let state = self.read()?;
        let mut scores: HashMap<MovieId, Vec<RatingScore>> = HashMap::new();
        for r in state.ratings.values() {
            scores.entry(r.movie_id).or_default().push(r.score);
        }
        Ok(scores
            .into_iter()
            .filter_map(|(id, s)| average_rating(&s).map(|avg| (id, avg)))
            .collect())
    }
}

#[async_trait]
impl RentalStore for InMemoryStore {
    async fn create_rental(&self, rental: Rental) -> StoreResult<Rental> {
        let mut state = self.write()?;
        if state.rentals.values().any(|r| r.code == rental.code) {
            return Err(StoreError::Conflict(format!("rental code {} already in use", rental.code)));
        }
        if !state.users.contains_key(&rental.user_id) {
            return Err(StoreError::NotFound("user"));
        }

        let movie = state.movies.get_mut(&rental.movie_id).ok_or(StoreError::NotFound("movie"))?;
        if !movie.is_available() {
            return Err(StoreError::OutOfStock);
        }
        movie
            .adjust_stock(-1)
            .map_err(|_| StoreError::OutOfStock)?;
        movie.updated_at = rental.created_at;

        state.rentals.insert(rental.id, rental.clone());
        Ok(rental)
    }

    async fn get_rental(&self, id: RentalId) -> StoreResult<Option<Rental>> {
        Ok(self.read()?.rentals.get(&id).cloned())
    }

    async fn find_rental_by_code(&self, code: &RentalCode) -> StoreResult<Option<Rental>> {
        Ok(self.read()?.rentals.values().find(|r| &r.code == code).cloned())
    }

    async fn rental_code_exists(&self, code: &RentalCode) -> StoreResult<bool> {
        Ok(self.read()?.rentals.values().any(|r| &r.code == code))
    }

    async fn list_rentals(&self, query: RentalQuery) -> StoreResult<Vec<Rental>> {
        let mut rentals: Vec<Rental> = self
            .read()?
            .rentals
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        rentals.sort_by(|a, b| b.rental_date.cmp(&a.rental_date).then(b.id.cmp(&a.id)));
        Ok(rentals)
    }

    async fn apply_transition(&self, rental: &Rental, from: RentalStatus, effect: StockEffect) -> StoreResult<Rental> {
        let mut state = self.write()?;

        match state.rentals.get(&rental.id) {
            None => return Err(StoreError::NotFound("rental")),
            Some(stored) if stored.status != from => {
                return Err(StoreError::Conflict(format!(
                    "rental is {} (expected {from})",
                    stored.status
                )));
            }
            Some(_) => {}
        }

        if effect.delta() != 0 {
            // Movie may be gone only if it was deleted, which also deletes
            // its rentals; treat a missing movie as a stale rental.
            let movie = state.movies.get_mut(&rental.movie_id).ok_or(StoreError::NotFound("movie"))?;
            movie
                .adjust_stock(effect.delta())
                .map_err(|e| StoreError::Conflict(e.to_string()))?;
            movie.updated_at = rental.updated_at;
        }

        state.rentals.insert(rental.id, rental.clone());
        Ok(rental.clone())
    }
}
