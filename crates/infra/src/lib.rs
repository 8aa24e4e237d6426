//! Infrastructure layer: configuration, storage backends, the email queue
//! transport, image files and background workers.

pub mod config;
pub mod event_bus;
pub mod images;
pub mod seed;
pub mod store;
pub mod workers;

pub use config::{AppConfig, ConfigError};
pub use images::{ImageError, ImageStore, StoredImage};
pub use seed::{DEMO_PASSWORD, seed_demo_data};
pub use store::{
    CatalogStore, RatingStore, RentalQuery, RentalStore, Store, StoreError, StoreResult, UserStore,
    in_memory::InMemoryStore, postgres::PostgresStore,
};
pub use workers::queue_worker::{QueueWorker, WorkerHandle};
