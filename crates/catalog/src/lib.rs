//! Catalog domain: movies, their actors and categories, user ratings and
//! the movie search filter.
//!
//! Pure, deterministic domain logic (no IO, no HTTP, no storage).

pub mod filter;
pub mod movie;
pub mod rating;

pub use filter::MovieFilter;
pub use movie::{Actor, Category, Movie, MovieDraft, names_match};
pub use rating::{Rating, RatingScore, average_rating};
