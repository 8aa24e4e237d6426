//! Service layer: the operations behind every route.
//!
//! Handlers stay thin (extract, call one service method, map the result);
//! authorization, lookups, stock bookkeeping and notifications live here.

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;
use tracing::{info, warn};

use movierent_accounts::{AuthzError, Hs256JwtIssuer, Hs256JwtValidator, JwtValidator, PasswordError, TokenError};
use movierent_core::DomainError;
use movierent_events::{EmailMessage, EmailQueue, InMemoryEventBus};
use movierent_infra::{AppConfig, ImageError, ImageStore, InMemoryStore, PostgresStore, Store, StoreError};
use movierent_rentals::RentalCodeGenerator;

pub mod accounts;
pub mod catalog;
pub mod rentals;

pub use catalog::{MovieInput, MovieView, RatingView};
pub use rentals::{NewRental, RentalView};

/// bcrypt work factor for production password hashes.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Shared application services, handed to handlers as an `Extension`.
pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub email_queue: Arc<dyn EmailQueue>,
    pub images: ImageStore,
    pub jwt_issuer: Hs256JwtIssuer,
    pub jwt_validator: Arc<dyn JwtValidator>,
    pub rental_codes: RentalCodeGenerator,
    pub bcrypt_cost: u32,
}

impl AppServices {
    /// Hand a notification to the email queue without blocking the request.
    ///
    /// Queue transports may do blocking IO, so the publish runs on the
    /// blocking pool. Failures are logged and never reach the caller.
    pub(crate) fn notify(&self, message: EmailMessage) {
        let queue = Arc::clone(&self.email_queue);
        tokio::task::spawn_blocking(move || queue.enqueue_best_effort(message));
    }
}

/// Build services from configuration (used by `main.rs`).
pub async fn build_services(config: &AppConfig) -> ServiceResult<AppServices> {
    let store: Arc<dyn Store> = if config.use_persistent_stores {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| ServiceError::Internal("DATABASE_URL is not set".to_string()))?;
        let pg = PostgresStore::connect(url).await?;
        pg.migrate().await?;
        info!("using postgres stores");
        Arc::new(pg)
    } else {
        info!("using in-memory stores");
        Arc::new(InMemoryStore::new())
    };

    let images = ImageStore::open(&config.image_storage_dir).await?;
    let rental_codes = RentalCodeGenerator::new(config.rental_code_length)?;

    Ok(AppServices {
        store,
        email_queue: build_email_queue(config),
        images,
        jwt_issuer: Hs256JwtIssuer::new(
            config.jwt_secret.clone().into_bytes(),
            Duration::minutes(config.jwt_ttl_minutes),
        ),
        jwt_validator: Arc::new(Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes())),
        rental_codes,
        bcrypt_cost: DEFAULT_BCRYPT_COST,
    })
}

#[cfg(feature = "redis")]
fn build_email_queue(config: &AppConfig) -> Arc<dyn EmailQueue> {
    use movierent_infra::event_bus::RedisStreamsEventBus;

    match RedisStreamsEventBus::new(&config.redis_url, Some(config.email_stream_key.clone())) {
        Ok(bus) => {
            info!(stream = bus.stream_key(), "publishing emails to redis stream");
            Arc::new(bus)
        }
        Err(e) => {
            warn!(error = %e, "redis email queue unavailable, emails stay in-process");
            Arc::new(InMemoryEventBus::<EmailMessage>::new())
        }
    }
}

#[cfg(not(feature = "redis"))]
fn build_email_queue(_config: &AppConfig) -> Arc<dyn EmailQueue> {
    warn!("redis feature not enabled, emails stay in-process");
    Arc::new(InMemoryEventBus::<EmailMessage>::new())
}

/// In-memory services for dev and tests. The returned bus receives every
/// email the API enqueues.
pub async fn build_in_memory_services(
    jwt_secret: &str,
    image_dir: impl Into<std::path::PathBuf>,
) -> ServiceResult<(AppServices, Arc<InMemoryEventBus<EmailMessage>>)> {
    let bus = Arc::new(InMemoryEventBus::<EmailMessage>::new());
    let services = AppServices {
        store: Arc::new(InMemoryStore::new()),
        email_queue: bus.clone(),
        images: ImageStore::open(image_dir).await?,
        jwt_issuer: Hs256JwtIssuer::new(jwt_secret.as_bytes().to_vec(), Duration::minutes(60)),
        jwt_validator: Arc::new(Hs256JwtValidator::new(jwt_secret.as_bytes().to_vec())),
        rental_codes: RentalCodeGenerator::default(),
        bcrypt_cost: 4,
    };
    Ok((services, bus))
}
