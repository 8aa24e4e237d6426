//! Rental lifecycle: order, take, return, cancel, and the listings around it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use movierent_accounts::Permission;
use movierent_core::{DomainError, MovieId, RentalId, UserId};
use movierent_events::EmailMessage;
use movierent_infra::{CatalogStore, RentalQuery, RentalStore, StoreError, UserStore};
use movierent_rentals::{MAX_CODE_ATTEMPTS, Rental, RentalCode, RentalStatus, StockEffect};

use super::{AppServices, ServiceError, ServiceResult};
use crate::authz::{require, require_owner};
use crate::context::PrincipalContext;

/// A rental with the names clients display next to it.
#[derive(Debug, Clone)]
pub struct RentalView {
    pub rental: Rental,
    pub user_full_name: Option<String>,
    pub movie_title: Option<String>,
}

/// Order request. `user_id` defaults to the caller; dates default to now and
/// now + 7 days.
#[derive(Debug, Clone)]
pub struct NewRental {
    pub movie_id: MovieId,
    pub user_id: Option<UserId>,
    pub rental_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
}

impl AppServices {
    /// Reserve one copy of a movie under a fresh rental code and queue the
    /// confirmation email.
    #[instrument(skip(self, principal), fields(caller = %principal.user_id()))]
    pub async fn create_rental(&self, principal: &PrincipalContext, req: NewRental) -> ServiceResult<RentalView> {
        let user_id = req.user_id.unwrap_or(principal.user_id());
        require_owner(principal, user_id, Permission::RENTALS_CREATE)?;

        let user = self.load_user(user_id).await?;
        let movie = self.load_movie(req.movie_id).await?;
        if !movie.is_available() {
            return Err(StoreError::OutOfStock.into());
        }

        let now = Utc::now();
        let mut rental: Option<Rental> = None;
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = self.rental_codes.generate(&mut rand::thread_rng());
            if self.store.rental_code_exists(&code).await? {
                warn!(attempt, "rental code collision, regenerating");
                continue;
            }

            let candidate = match rental.take() {
                Some(previous) => previous.with_code(code),
                None => Rental::order(user_id, movie.id, code, req.rental_date, req.return_date, now)?,
            };

            match self.store.create_rental(candidate.clone()).await {
                Ok(saved) => {
                    info!(rental_id = %saved.id, code = %saved.code, "rental created");
                    self.notify(EmailMessage::rental_confirmation(
                        user.email.clone(),
                        user.full_name.clone(),
                        movie.title.clone(),
                        saved.code.as_str(),
                    ));
                    return Ok(RentalView {
                        rental: saved,
                        user_full_name: Some(user.full_name),
                        movie_title: Some(movie.title),
                    });
                }
                // Lost a race for the same code between the check and the insert.
                Err(StoreError::Conflict(msg)) => {
                    warn!(attempt, %msg, "rental code taken on insert, regenerating");
                    rental = Some(candidate);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DomainError::conflict(format!(
            "could not generate a unique rental code after {MAX_CODE_ATTEMPTS} attempts"
        ))
        .into())
    }

    pub async fn get_rental(&self, principal: &PrincipalContext, id: RentalId) -> ServiceResult<RentalView> {
        let rental = self.load_rental(id).await?;
        require_owner(principal, rental.user_id, Permission::RENTALS_READ)?;
        self.describe_rental(rental).await
    }

    pub async fn rental_by_code(&self, principal: &PrincipalContext, code: &str) -> ServiceResult<RentalView> {
        let code = RentalCode::parse(code)?;
        let rental = self
            .store
            .find_rental_by_code(&code)
            .await?
            .ok_or(ServiceError::NotFound("rental"))?;
        require_owner(principal, rental.user_id, Permission::RENTALS_READ)?;
        self.describe_rental(rental).await
    }

    /// ORDERED|TAKEN → CANCELLED. A TAKEN copy goes back into stock.
    #[instrument(skip(self, principal))]
    pub async fn cancel_rental(&self, principal: &PrincipalContext, id: RentalId) -> ServiceResult<RentalView> {
        let rental = self.load_rental(id).await?;
        require_owner(principal, rental.user_id, Permission::RENTALS_CANCEL)?;
        self.transition(rental, Rental::cancel).await
    }

    /// ORDERED → TAKEN (customer picked the copy up).
    #[instrument(skip(self, principal))]
    pub async fn take_rental(&self, principal: &PrincipalContext, id: RentalId) -> ServiceResult<RentalView> {
        require(principal, Permission::RENTALS_MANAGE)?;
        let rental = self.load_rental(id).await?;
        self.transition(rental, Rental::take).await
    }

    /// TAKEN → RETURNED; the copy goes back into stock.
    #[instrument(skip(self, principal))]
    pub async fn return_rental(&self, principal: &PrincipalContext, id: RentalId) -> ServiceResult<RentalView> {
        require(principal, Permission::RENTALS_MANAGE)?;
        let rental = self.load_rental(id).await?;
        self.transition(rental, Rental::mark_returned).await
    }

    /// Admin listing, newest first. An unknown `email` is a 404 rather than an
    /// empty list.
    pub async fn admin_rentals(
        &self,
        principal: &PrincipalContext,
        email: Option<&str>,
        status: Option<RentalStatus>,
    ) -> ServiceResult<Vec<RentalView>> {
        require(principal, Permission::RENTALS_MANAGE)?;

        let user_id = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => Some(self.user_by_email(principal, email).await?.id),
            None => None,
        };
        let rentals = self
            .store
            .list_rentals(RentalQuery {
                user_id,
                status,
                ..Default::default()
            })
            .await?;
        self.describe_rentals(rentals).await
    }

    pub async fn movie_rentals(&self, principal: &PrincipalContext, movie_id: MovieId) -> ServiceResult<Vec<RentalView>> {
        require(principal, Permission::RENTALS_MANAGE)?;
        self.load_movie(movie_id).await?;

        let rentals = self
            .store
            .list_rentals(RentalQuery {
                movie_id: Some(movie_id),
                ..Default::default()
            })
            .await?;
        self.describe_rentals(rentals).await
    }

    async fn transition<F>(&self, mut rental: Rental, step: F) -> ServiceResult<RentalView>
    where
        F: FnOnce(&mut Rental, DateTime<Utc>) -> Result<StockEffect, DomainError>,
    {
        let from = rental.status;
        let effect = step(&mut rental, Utc::now())?;
        let saved = self.store.apply_transition(&rental, from, effect).await?;

        info!(
            rental_id = %saved.id,
            from = from.as_str(),
            to = saved.status.as_str(),
            stock_delta = effect.delta(),
            "rental status changed"
        );
        self.describe_rental(saved).await
    }

    async fn load_rental(&self, id: RentalId) -> ServiceResult<Rental> {
        self.store.get_rental(id).await?.ok_or(ServiceError::NotFound("rental"))
    }

    async fn describe_rental(&self, rental: Rental) -> ServiceResult<RentalView> {
        let mut views = self.describe_rentals(vec![rental]).await?;
        views.pop().ok_or_else(|| ServiceError::Internal("rental vanished while describing it".to_string()))
    }

    /// Attach user names and movie titles, looking each one up once.
    pub(crate) async fn describe_rentals(&self, rentals: Vec<Rental>) -> ServiceResult<Vec<RentalView>> {
        let mut users: HashMap<UserId, Option<String>> = HashMap::new();
        let mut movies: HashMap<MovieId, Option<String>> = HashMap::new();

        let mut out = Vec::with_capacity(rentals.len());
        for rental in rentals {
            if !users.contains_key(&rental.user_id) {
                let name = self.store.get_user(rental.user_id).await?.map(|u| u.full_name);
                users.insert(rental.user_id, name);
            }
            if !movies.contains_key(&rental.movie_id) {
                let title = self.store.get_movie(rental.movie_id).await?.map(|m| m.title);
                movies.insert(rental.movie_id, title);
            }
            out.push(RentalView {
                user_full_name: users.get(&rental.user_id).cloned().flatten(),
                movie_title: movies.get(&rental.movie_id).cloned().flatten(),
                rental,
            });
        }
        Ok(out)
    }
}
