//! Movies, categories, ratings and poster images.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, instrument, warn};

use movierent_accounts::Permission;
use movierent_catalog::{Actor, Category, Movie, MovieDraft, MovieFilter, Rating, RatingScore, average_rating};
use movierent_core::{MovieId, UserId};
use movierent_infra::{CatalogStore, RatingStore, StoredImage, UserStore};

use super::{AppServices, ServiceError, ServiceResult};
use crate::authz::{require, require_owner};
use crate::context::PrincipalContext;

/// A movie with its current average rating.
#[derive(Debug, Clone)]
pub struct MovieView {
    pub movie: Movie,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RatingView {
    pub rating: Rating,
    pub user_full_name: Option<String>,
}

/// Admin input for creating or editing a movie. Actor and category names
/// are resolved (find-or-create) before the movie is built; `None` keeps the
/// current set on edit and means "none" on create.
#[derive(Debug, Clone, Default)]
pub struct MovieInput {
    pub draft: MovieDraft,
    pub actors: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
}

impl AppServices {
    pub async fn list_movies(&self, filter: &MovieFilter) -> ServiceResult<Vec<MovieView>> {
        let averages = self.store.average_ratings().await?;
        let mut movies: Vec<MovieView> = self
            .store
            .list_movies()
            .await?
            .into_iter()
            .map(|movie| MovieView {
                average_rating: averages.get(&movie.id).copied(),
                movie,
            })
            .filter(|v| filter.matches(&v.movie, v.average_rating))
            .collect();
        movies.sort_by(|a, b| a.movie.title.cmp(&b.movie.title));
        Ok(movies)
    }

    /// Movies with at least one copy in stock.
    pub async fn available_movies(&self) -> ServiceResult<Vec<MovieView>> {
        let mut movies = self.list_movies(&MovieFilter::default()).await?;
        movies.retain(|v| v.movie.is_available());
        Ok(movies)
    }

    pub async fn get_movie(&self, id: MovieId) -> ServiceResult<MovieView> {
        let movie = self.load_movie(id).await?;
        let average_rating = self.movie_average(id).await?;
        Ok(MovieView { movie, average_rating })
    }

    pub async fn list_categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn movie_ratings(&self, id: MovieId) -> ServiceResult<Vec<RatingView>> {
        self.load_movie(id).await?;

        let ratings = self.store.ratings_for_movie(id).await?;
        let mut names: HashMap<UserId, Option<String>> = HashMap::new();
        let mut out = Vec::with_capacity(ratings.len());
        for rating in ratings {
            if !names.contains_key(&rating.user_id) {
                let name = self.store.get_user(rating.user_id).await?.map(|u| u.full_name);
                names.insert(rating.user_id, name);
            }
            out.push(RatingView {
                user_full_name: names.get(&rating.user_id).cloned().flatten(),
                rating,
            });
        }
        Ok(out)
    }

    /// Average score and number of ratings; `None` average when unrated.
    pub async fn movie_rating_summary(&self, id: MovieId) -> ServiceResult<(Option<f64>, usize)> {
        self.load_movie(id).await?;
        let scores: Vec<RatingScore> = self
            .store
            .ratings_for_movie(id)
            .await?
            .into_iter()
            .map(|r| r.score)
            .collect();
        Ok((average_rating(&scores), scores.len()))
    }

    /// Rate a movie as `user_id` (defaults to the caller). Re-rating replaces
    /// the previous score.
    #[instrument(skip(self, principal), fields(caller = %principal.user_id()))]
    pub async fn rate_movie(
        &self,
        principal: &PrincipalContext,
        movie_id: MovieId,
        user_id: Option<UserId>,
        score: i32,
    ) -> ServiceResult<RatingView> {
        let user_id = user_id.unwrap_or(principal.user_id());
        require_owner(principal, user_id, Permission::MOVIES_RATE)?;

        let score = RatingScore::new(score)?;
        self.load_movie(movie_id).await?;
        let user = self.load_user(user_id).await?;

        let rating = self.store.upsert_rating(user_id, movie_id, score, Utc::now()).await?;
        info!(rating_id = %rating.id, score = score.value(), "movie rated");
        Ok(RatingView {
            rating,
            user_full_name: Some(user.full_name),
        })
    }

    #[instrument(skip(self, principal, input), fields(title = %input.draft.title))]
    pub async fn create_movie(&self, principal: &PrincipalContext, input: MovieInput) -> ServiceResult<MovieView> {
        require(principal, Permission::CATALOG_MANAGE)?;

        let actors = self.resolve_actors(input.actors.unwrap_or_default()).await?;
        let categories = self.resolve_categories(input.categories.unwrap_or_default()).await?;
        let movie = Movie::create(input.draft, actors, categories, Utc::now())?;
        let movie = self.store.insert_movie(movie).await?;

        info!(movie_id = %movie.id, "movie created");
        Ok(MovieView {
            movie,
            average_rating: None,
        })
    }

    /// Replace a movie's editable fields. A poster the movie no longer points
    /// at is deleted from image storage (best-effort).
    #[instrument(skip(self, principal, input))]
    pub async fn update_movie(
        &self,
        principal: &PrincipalContext,
        id: MovieId,
        input: MovieInput,
    ) -> ServiceResult<MovieView> {
        require(principal, Permission::CATALOG_MANAGE)?;

        let mut movie = self.load_movie(id).await?;
        let actors = match input.actors {
            Some(names) => Some(self.resolve_actors(names).await?),
            None => None,
        };
        let categories = match input.categories {
            Some(names) => Some(self.resolve_categories(names).await?),
            None => None,
        };

        let replaced_image = movie.revise(input.draft, actors, categories, Utc::now())?;
        let movie = self.store.update_movie(movie).await?;
        if let Some(old) = replaced_image {
            self.discard_image(&old).await;
        }

        info!(movie_id = %movie.id, "movie updated");
        let average_rating = self.movie_average(id).await?;
        Ok(MovieView { movie, average_rating })
    }

    /// Delete a movie with its ratings and rentals. Refused while any rental
    /// of it is TAKEN.
    #[instrument(skip(self, principal))]
    pub async fn delete_movie(&self, principal: &PrincipalContext, id: MovieId) -> ServiceResult<()> {
        require(principal, Permission::CATALOG_MANAGE)?;

        let movie = self.store.delete_movie(id).await?;
        if let Some(image_id) = movie.image_id.as_deref() {
            self.discard_image(image_id).await;
        }

        info!(movie_id = %id, "movie deleted");
        Ok(())
    }

    pub async fn upload_image(
        &self,
        principal: &PrincipalContext,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> ServiceResult<String> {
        require(principal, Permission::IMAGES_MANAGE)?;
        Ok(self.images.upload(filename, bytes).await?)
    }

    pub async fn get_image(&self, id: &str) -> ServiceResult<StoredImage> {
        Ok(self.images.get(id).await?)
    }

    pub async fn delete_image(&self, principal: &PrincipalContext, id: &str) -> ServiceResult<()> {
        require(principal, Permission::IMAGES_MANAGE)?;
        if self.images.delete(id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("image"))
        }
    }

    pub(crate) async fn load_movie(&self, id: MovieId) -> ServiceResult<Movie> {
        self.store.get_movie(id).await?.ok_or(ServiceError::NotFound("movie"))
    }

    async fn movie_average(&self, id: MovieId) -> ServiceResult<Option<f64>> {
        let scores: Vec<RatingScore> = self
            .store
            .ratings_for_movie(id)
            .await?
            .into_iter()
            .map(|r| r.score)
            .collect();
        Ok(average_rating(&scores))
    }

    async fn resolve_actors(&self, names: Vec<String>) -> ServiceResult<Vec<Actor>> {
        let mut actors = Vec::with_capacity(names.len());
        for name in names {
            // Validate before touching the store so blank names never get inserted.
            Actor::new(&name)?;
            actors.push(self.store.find_or_create_actor(name.trim()).await?);
        }
        Ok(actors)
    }

    async fn resolve_categories(&self, names: Vec<String>) -> ServiceResult<Vec<Category>> {
        let mut categories = Vec::with_capacity(names.len());
        for name in names {
            Category::new(&name)?;
            categories.push(self.store.find_or_create_category(name.trim()).await?);
        }
        Ok(categories)
    }

    async fn discard_image(&self, id: &str) {
        match self.images.delete(id).await {
            Ok(true) => info!(image_id = id, "image deleted"),
            Ok(false) => warn!(image_id = id, "image to delete was not found"),
            Err(e) => warn!(image_id = id, error = %e, "failed to delete image"),
        }
    }
}
