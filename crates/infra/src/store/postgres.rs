//! Postgres-backed store.
//!
//! Runtime-checked queries (no compile-time `DATABASE_URL` needed). The
//! schema lives in `migrations/0001_init.sql` and is applied idempotently by
//! [`PostgresStore::migrate`].
//!
//! ## Atomicity
//!
//! Stock and rental status always change inside one transaction. The movie
//! row is locked (`FOR UPDATE`) before a transition or a delete, which
//! serialises them per movie.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use movierent_accounts::{Role, User, normalize_email};
use movierent_catalog::{Actor, Category, Movie, Rating, RatingScore};
use movierent_core::{ActorId, CategoryId, MovieId, RatingId, RentalId, UserId};
use movierent_rentals::{Rental, RentalCode, RentalStatus, StockEffect};

use super::{CatalogStore, RatingStore, RentalQuery, RentalStore, StoreError, StoreResult, UserStore};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const MOVIE_COLUMNS: &str = "id, title, description, release_year, director, duration_minutes, image_id, \
                             stock_quantity, created_at, updated_at";
const RENTAL_COLUMNS: &str = "id, user_id, movie_id, code, rental_date, return_date, status, created_at, updated_at";
const USER_COLUMNS: &str = "id, email, password_hash, full_name, phone_number, address, role, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self, operation: &str) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error(operation, e))
    }

    /// Attach actors and categories to bare movie rows.
    async fn hydrate_movies(&self, rows: Vec<PgRow>) -> StoreResult<Vec<Movie>> {
        let mut movies = rows.iter().map(movie_from_row).collect::<StoreResult<Vec<_>>>()?;
        if movies.is_empty() {
            return Ok(movies);
        }
        let ids: Vec<Uuid> = movies.iter().map(|m| *m.id.as_uuid()).collect();

        let actor_rows = sqlx::query(
            r#"
            SELECT ma.movie_id, a.id, a.name
            FROM movie_actors ma
            JOIN actors a ON a.id = ma.actor_id
            WHERE ma.movie_id = ANY($1)
            ORDER BY a.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_movie_actors", e))?;

        let category_rows = sqlx::query(
            r#"
            SELECT mc.movie_id, c.id, c.name
            FROM movie_categories mc
            JOIN categories c ON c.id = mc.category_id
            WHERE mc.movie_id = ANY($1)
            ORDER BY c.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_movie_categories", e))?;

        let mut actors: HashMap<Uuid, Vec<Actor>> = HashMap::new();
        for row in &actor_rows {
            let movie_id: Uuid = get(row, "movie_id")?;
            actors.entry(movie_id).or_default().push(Actor {
                id: ActorId::from_uuid(get(row, "id")?),
                name: get(row, "name")?,
            });
        }

        let mut categories: HashMap<Uuid, Vec<Category>> = HashMap::new();
        for row in &category_rows {
            let movie_id: Uuid = get(row, "movie_id")?;
            categories.entry(movie_id).or_default().push(Category {
                id: CategoryId::from_uuid(get(row, "id")?),
                name: get(row, "name")?,
            });
        }

        for movie in &mut movies {
            movie.actors = actors.remove(movie.id.as_uuid()).unwrap_or_default();
            movie.categories = categories.remove(movie.id.as_uuid()).unwrap_or_default();
        }
        Ok(movies)
    }
}

async fn write_movie_links(tx: &mut Transaction<'static, Postgres>, movie: &Movie) -> StoreResult<()> {
    let movie_id = movie.id.as_uuid();

    sqlx::query("DELETE FROM movie_actors WHERE movie_id = $1")
        .bind(movie_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("clear_movie_actors", e))?;
    sqlx::query("DELETE FROM movie_categories WHERE movie_id = $1")
        .bind(movie_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("clear_movie_categories", e))?;

    for actor in &movie.actors {
        sqlx::query("INSERT INTO movie_actors (movie_id, actor_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(movie_id)
            .bind(actor.id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("link_movie_actor", e))?;
    }
    for category in &movie.categories {
        sqlx::query("INSERT INTO movie_categories (movie_id, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(movie_id)
            .bind(category.id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("link_movie_category", e))?;
    }
    Ok(())
}

/// Lock the movie row for the rest of the transaction.
async fn lock_movie(tx: &mut Transaction<'static, Postgres>, movie_id: MovieId) -> StoreResult<()> {
    sqlx::query("SELECT id FROM movies WHERE id = $1 FOR UPDATE")
        .bind(movie_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_movie", e))?
        .map(|_| ())
        .ok_or(StoreError::NotFound("movie"))
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, phone_number, address, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone_number)
        .bind(&user.address)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| match map_sqlx_error("insert_user", e) {
            StoreError::Conflict(_) => StoreError::Conflict("email already registered".to_string()),
            other => other,
        })?;
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let Ok(email) = normalize_email(email) else {
            return Ok(None);
        };
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(&email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: User) -> StoreResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET full_name = $2, phone_number = $3, address = $4, role = $5, password_hash = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.full_name)
        .bind(&user.phone_number)
        .bind(&user.address)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(user)
    }

    async fn count_users(&self) -> StoreResult<u64> {
        count(&self.pool, "SELECT COUNT(*) AS n FROM users").await
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let rows = sqlx::query(&format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY created_at, id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_movies", e))?;
        self.hydrate_movies(rows).await
    }

    async fn get_movie(&self, id: MovieId) -> StoreResult<Option<Movie>> {
        let rows = sqlx::query(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_movie", e))?;
        Ok(self.hydrate_movies(rows).await?.into_iter().next())
    }

    #[instrument(skip(self, movie), fields(movie_id = %movie.id), err)]
    async fn insert_movie(&self, movie: Movie) -> StoreResult<Movie> {
        let mut tx = self.begin("insert_movie").await?;

        sqlx::query(
            r#"
            INSERT INTO movies (id, title, description, release_year, director, duration_minutes, image_id,
                                stock_quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(movie.id.as_uuid())
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.release_year)
        .bind(&movie.director)
        .bind(movie.duration_minutes)
        .bind(&movie.image_id)
        .bind(movie.stock_quantity)
        .bind(movie.created_at)
        .bind(movie.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movie", e))?;

        write_movie_links(&mut tx, &movie).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_insert_movie", e))?;
        Ok(movie)
    }

    #[instrument(skip(self, movie), fields(movie_id = %movie.id), err)]
    async fn update_movie(&self, movie: Movie) -> StoreResult<Movie> {
        let mut tx = self.begin("update_movie").await?;

        let result = sqlx::query(
            r#"
            UPDATE movies
            SET title = $2, description = $3, release_year = $4, director = $5, duration_minutes = $6,
                image_id = $7, stock_quantity = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(movie.id.as_uuid())
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.release_year)
        .bind(&movie.director)
        .bind(movie.duration_minutes)
        .bind(&movie.image_id)
        .bind(movie.stock_quantity)
        .bind(movie.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_movie", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("movie"));
        }

        write_movie_links(&mut tx, &movie).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_update_movie", e))?;
        Ok(movie)
    }

    #[instrument(skip(self), fields(movie_id = %id), err)]
    async fn delete_movie(&self, id: MovieId) -> StoreResult<Movie> {
        let movie = self.get_movie(id).await?.ok_or(StoreError::NotFound("movie"))?;

        let mut tx = self.begin("delete_movie").await?;
        lock_movie(&mut tx, id).await?;

        let taken: bool = sqlx::query("SELECT EXISTS (SELECT 1 FROM rentals WHERE movie_id = $1 AND status = 'TAKEN') AS taken")
            .bind(id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("check_taken_rentals", e))
            .and_then(|row| get(&row, "taken"))?;
        if taken {
            return Err(StoreError::Conflict("cannot delete movie with active rentals".to_string()));
        }

        // ratings, rentals and link rows go with ON DELETE CASCADE
        sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_movie", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit_delete_movie", e))?;
        Ok(movie)
    }

    async fn count_movies(&self) -> StoreResult<u64> {
        count(&self.pool, "SELECT COUNT(*) AS n FROM movies").await
    }

    async fn find_or_create_actor(&self, name: &str) -> StoreResult<Actor> {
        let candidate = Actor::new(name)?;
        let (id, name) = find_or_create_named(&self.pool, "actors", *candidate.id.as_uuid(), &candidate.name).await?;
        Ok(Actor {
            id: ActorId::from_uuid(id),
            name,
        })
    }

    async fn find_or_create_category(&self, name: &str) -> StoreResult<Category> {
        let candidate = Category::new(name)?;
        let (id, name) =
            find_or_create_named(&self.pool, "categories", *candidate.id.as_uuid(), &candidate.name).await?;
        Ok(Category {
            id: CategoryId::from_uuid(id),
            name,
        })
    }

    async fn list_actors(&self) -> StoreResult<Vec<Actor>> {
        let rows = sqlx::query("SELECT id, name FROM actors ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_actors", e))?;
        rows.iter()
            .map(|row| {
                Ok(Actor {
                    id: ActorId::from_uuid(get(row, "id")?),
                    name: get(row, "name")?,
                })
            })
            .collect()
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter()
            .map(|row| {
                Ok(Category {
                    id: CategoryId::from_uuid(get(row, "id")?),
                    name: get(row, "name")?,
                })
            })
            .collect()
    }
}

/// Shared find-or-create for the `actors` / `categories` name tables.
async fn find_or_create_named(pool: &PgPool, table: &'static str, id: Uuid, name: &str) -> StoreResult<(Uuid, String)> {
    sqlx::query(&format!(
        "INSERT INTO {table} (id, name) VALUES ($1, $2) ON CONFLICT ((LOWER(name))) DO NOTHING"
    ))
    .bind(id)
    .bind(name)
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_error("insert_named", e))?;

    let row = sqlx::query(&format!("SELECT id, name FROM {table} WHERE LOWER(name) = LOWER($1)"))
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|e| map_sqlx_error("select_named", e))?;

    Ok((get(&row, "id")?, get(&row, "name")?))
}

#[async_trait]
impl RatingStore for PostgresStore {
    #[instrument(skip(self, score, now), fields(user_id = %user_id, movie_id = %movie_id), err)]
    async fn upsert_rating(
        &self,
        user_id: UserId,
        movie_id: MovieId,
        score: RatingScore,
        now: DateTime<Utc>,
    ) -> StoreResult<Rating> {
        let row = sqlx::query(
            r#"
            INSERT INTO ratings (id, user_id, movie_id, score, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, movie_id) DO UPDATE SET score = EXCLUDED.score
            RETURNING id, user_id, movie_id, score, created_at
            "#,
        )
        .bind(RatingId::new().as_uuid())
        .bind(user_id.as_uuid())
        .bind(movie_id.as_uuid())
        .bind(score.value())
        .bind(now)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_rating", e))?;
        rating_from_row(&row)
    }

    async fn ratings_for_movie(&self, movie_id: MovieId) -> StoreResult<Vec<Rating>> {
        let rows = sqlx::query(
            "SELECT id, user_id, movie_id, score, created_at FROM ratings WHERE movie_id = $1 ORDER BY created_at, id",
        )
        .bind(movie_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ratings_for_movie", e))?;
        rows.iter().map(rating_from_row).collect()
    }

    async fn ratings_by_user(&self, user_id: UserId) -> StoreResult<Vec<Rating>> {
        let rows = sqlx::query(
            "SELECT id, user_id, movie_id, score, created_at FROM ratings WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ratings_by_user", e))?;
        rows.iter().map(rating_from_row).collect()
    }

    async fn average_ratings(&self) -> StoreResult<HashMap<MovieId, f64>> {
        let rows = sqlx::query("SELECT movie_id, AVG(score)::FLOAT8 AS average FROM ratings GROUP BY movie_id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("average_ratings", e))?;
        rows.iter()
            .map(|row| Ok((MovieId::from_uuid(get(row, "movie_id")?), get(row, "average")?)))
            .collect()
    }
}

#[async_trait]
impl RentalStore for PostgresStore {
    #[instrument(skip(self, rental), fields(rental_id = %rental.id, movie_id = %rental.movie_id), err)]
    async fn create_rental(&self, rental: Rental) -> StoreResult<Rental> {
        let mut tx = self.begin("create_rental").await?;

        let reserved = sqlx::query(
            r#"
            UPDATE movies
            SET stock_quantity = stock_quantity - 1, updated_at = $2
            WHERE id = $1 AND stock_quantity > 0
            RETURNING id
            "#,
        )
        .bind(rental.movie_id.as_uuid())
        .bind(rental.created_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("reserve_stock", e))?;

        if reserved.is_none() {
            let exists = sqlx::query("SELECT 1 AS one FROM movies WHERE id = $1")
                .bind(rental.movie_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("check_movie", e))?
                .is_some();
            return Err(if exists { StoreError::OutOfStock } else { StoreError::NotFound("movie") });
        }

        sqlx::query(&format!(
            "INSERT INTO rentals ({RENTAL_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(rental.id.as_uuid())
        .bind(rental.user_id.as_uuid())
        .bind(rental.movie_id.as_uuid())
        .bind(rental.code.as_str())
        .bind(rental.rental_date)
        .bind(rental.return_date)
        .bind(rental.status.as_str())
        .bind(rental.created_at)
        .bind(rental.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match map_sqlx_error("insert_rental", e) {
            StoreError::Conflict(_) => StoreError::Conflict(format!("rental code {} already in use", rental.code)),
            other => other,
        })?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit_create_rental", e))?;
        Ok(rental)
    }

    async fn get_rental(&self, id: RentalId) -> StoreResult<Option<Rental>> {
        let row = sqlx::query(&format!("SELECT {RENTAL_COLUMNS} FROM rentals WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_rental", e))?;
        row.as_ref().map(rental_from_row).transpose()
    }

    async fn find_rental_by_code(&self, code: &RentalCode) -> StoreResult<Option<Rental>> {
        let row = sqlx::query(&format!("SELECT {RENTAL_COLUMNS} FROM rentals WHERE code = $1"))
            .bind(code.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_rental_by_code", e))?;
        row.as_ref().map(rental_from_row).transpose()
    }

    async fn rental_code_exists(&self, code: &RentalCode) -> StoreResult<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM rentals WHERE code = $1) AS taken")
            .bind(code.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("rental_code_exists", e))?;
        get(&row, "taken")
    }

    async fn list_rentals(&self, query: RentalQuery) -> StoreResult<Vec<Rental>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RENTAL_COLUMNS} FROM rentals
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR movie_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY rental_date DESC, id DESC
            "#
        ))
        .bind(query.user_id.map(Uuid::from))
        .bind(query.movie_id.map(Uuid::from))
        .bind(query.status.map(RentalStatus::as_str))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_rentals", e))?;
        rows.iter().map(rental_from_row).collect()
    }

    #[instrument(skip(self, rental), fields(rental_id = %rental.id, to = %rental.status, delta = effect.delta()), err)]
    async fn apply_transition(&self, rental: &Rental, from: RentalStatus, effect: StockEffect) -> StoreResult<Rental> {
        let mut tx = self.begin("apply_transition").await?;
        lock_movie(&mut tx, rental.movie_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE rentals
            SET status = $2, return_date = $3, updated_at = $4
            WHERE id = $1 AND status = $5
            "#,
        )
        .bind(rental.id.as_uuid())
        .bind(rental.status.as_str())
        .bind(rental.return_date)
        .bind(rental.updated_at)
        .bind(from.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_rental_status", e))?;

        if result.rows_affected() == 0 {
            let current: Option<String> = sqlx::query("SELECT status FROM rentals WHERE id = $1")
                .bind(rental.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("check_rental_status", e))?
                .map(|row| get(&row, "status"))
                .transpose()?;
            return Err(match current {
                None => StoreError::NotFound("rental"),
                Some(status) => StoreError::Conflict(format!("rental is {status} (expected {from})")),
            });
        }

        if effect.delta() != 0 {
            sqlx::query("UPDATE movies SET stock_quantity = stock_quantity + $2, updated_at = $3 WHERE id = $1")
                .bind(rental.movie_id.as_uuid())
                .bind(effect.delta())
                .bind(rental.updated_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("apply_stock_effect", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transition", e))?;
        Ok(rental.clone())
    }
}

async fn count(pool: &PgPool, sql: &'static str) -> StoreResult<u64> {
    let row = sqlx::query(sql)
        .fetch_one(pool)
        .await
        .map_err(|e| map_sqlx_error("count", e))?;
    let n: i64 = get(&row, "n")?;
    Ok(n.max(0) as u64)
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to read column {column}: {e}")))
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let role: String = get(row, "role")?;
    Ok(User {
        id: UserId::from_uuid(get(row, "id")?),
        email: get(row, "email")?,
        password_hash: get(row, "password_hash")?,
        full_name: get(row, "full_name")?,
        phone_number: get(row, "phone_number")?,
        address: get(row, "address")?,
        role: Role::new(role),
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn movie_from_row(row: &PgRow) -> StoreResult<Movie> {
    Ok(Movie {
        id: MovieId::from_uuid(get(row, "id")?),
        title: get(row, "title")?,
        description: get(row, "description")?,
        release_year: get(row, "release_year")?,
        director: get(row, "director")?,
        duration_minutes: get(row, "duration_minutes")?,
        image_id: get(row, "image_id")?,
        actors: Vec::new(),
        categories: Vec::new(),
        stock_quantity: get(row, "stock_quantity")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn rating_from_row(row: &PgRow) -> StoreResult<Rating> {
    let score: i32 = get(row, "score")?;
    Ok(Rating {
        id: RatingId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        movie_id: MovieId::from_uuid(get(row, "movie_id")?),
        score: RatingScore::new(score).map_err(|e| StoreError::Backend(e.to_string()))?,
        created_at: get(row, "created_at")?,
    })
}

fn rental_from_row(row: &PgRow) -> StoreResult<Rental> {
    let code: String = get(row, "code")?;
    let status: String = get(row, "status")?;
    Ok(Rental {
        id: RentalId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        movie_id: MovieId::from_uuid(get(row, "movie_id")?),
        code: RentalCode::parse(&code).map_err(|e| StoreError::Backend(e.to_string()))?,
        rental_date: get(row, "rental_date")?,
        return_date: get(row, "return_date")?,
        status: status.parse().map_err(|e: movierent_core::DomainError| StoreError::Backend(e.to_string()))?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // unique violation
                Some("23505") => StoreError::Conflict(msg),
                // foreign key violation: the referenced user/movie is gone
                Some("23503") => match db_err.constraint() {
                    Some(c) if c.contains("user") => StoreError::NotFound("user"),
                    _ => StoreError::NotFound("movie"),
                },
                // check violation (negative stock, bad score)
                Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
