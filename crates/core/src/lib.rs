//! `movierent-core`: shared domain building blocks.
//!
//! Identifiers, the domain error model and the small entity/value-object
//! vocabulary used by the catalog, accounts and rentals crates. No IO here.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ActorId, CategoryId, MovieId, RatingId, RentalId, UserId};
pub use value_object::ValueObject;
