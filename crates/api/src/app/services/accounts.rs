//! Registration, login and user profiles.

use chrono::Utc;
use tracing::{info, instrument};

use movierent_accounts::{Permission, RegisterUser, UpdateProfile, User, hash_password, verify_password};
use movierent_catalog::Rating;
use movierent_core::{DomainError, UserId};
use movierent_events::EmailMessage;
use movierent_infra::{RatingStore, RentalQuery, RentalStore, StoreError, UserStore};

use super::{AppServices, RentalView, ServiceError, ServiceResult};
use crate::authz::{require, require_owner};
use crate::context::PrincipalContext;

impl AppServices {
    /// Create a USER account and queue the welcome email.
    #[instrument(skip(self, cmd, password), fields(email = %cmd.email))]
    pub async fn register(&self, cmd: RegisterUser, password: String) -> ServiceResult<User> {
        if self.store.find_user_by_email(&cmd.email).await?.is_some() {
            return Err(DomainError::conflict("email is already registered").into());
        }

        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??;

        let user = User::register(cmd, password_hash, Utc::now())?;
        let user = self.store.insert_user(user).await.map_err(|e| match e {
            StoreError::Conflict(_) => ServiceError::Domain(DomainError::conflict("email is already registered")),
            other => other.into(),
        })?;

        info!(user_id = %user.id, "user registered");
        self.notify(EmailMessage::registration(user.email.clone(), user.full_name.clone()));
        Ok(user)
    }

    /// Check credentials and mint a bearer token. Unknown emails and wrong
    /// passwords fail the same way.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: String) -> ServiceResult<(String, User)> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if !verified {
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.jwt_issuer.issue(&user, Utc::now())?;
        info!(user_id = %user.id, "user logged in");
        Ok((token, user))
    }

    pub async fn get_user(&self, principal: &PrincipalContext, id: UserId) -> ServiceResult<User> {
        require_owner(principal, id, Permission::USERS_READ)?;
        self.load_user(id).await
    }

    pub async fn update_user(&self, principal: &PrincipalContext, id: UserId, cmd: UpdateProfile) -> ServiceResult<User> {
        require_owner(principal, id, Permission::USERS_UPDATE)?;

        let mut user = self.load_user(id).await?;
        user.update_profile(cmd, Utc::now())?;
        Ok(self.store.update_user(user).await?)
    }

    /// Rental history of a user, newest first.
    pub async fn user_rentals(&self, principal: &PrincipalContext, id: UserId) -> ServiceResult<Vec<RentalView>> {
        require_owner(principal, id, Permission::RENTALS_READ)?;
        self.load_user(id).await?;

        let rentals = self
            .store
            .list_rentals(RentalQuery {
                user_id: Some(id),
                ..Default::default()
            })
            .await?;
        self.describe_rentals(rentals).await
    }

    pub async fn user_ratings(&self, principal: &PrincipalContext, id: UserId) -> ServiceResult<Vec<Rating>> {
        require_owner(principal, id, Permission::USERS_READ)?;
        self.load_user(id).await?;
        Ok(self.store.ratings_by_user(id).await?)
    }

    /// Admin lookup used by the rental listing filter.
    pub async fn user_by_email(&self, principal: &PrincipalContext, email: &str) -> ServiceResult<User> {
        require(principal, Permission::RENTALS_MANAGE)?;
        self.store
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    pub(crate) async fn load_user(&self, id: UserId) -> ServiceResult<User> {
        self.store.get_user(id).await?.ok_or(ServiceError::NotFound("user"))
    }
}

