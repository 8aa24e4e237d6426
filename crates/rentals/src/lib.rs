//! Rentals domain: the rental state machine, the stock bookkeeping that goes
//! with each transition, and rental-code generation.
//!
//! ```text
//! ORDERED ──take──▶ TAKEN ──return──▶ RETURNED
//!    │                │
//!    └────cancel──────┴──────────────▶ CANCELLED
//! ```

pub mod code;
pub mod rental;

pub use code::{DEFAULT_CODE_LENGTH, MAX_CODE_ATTEMPTS, RentalCode, RentalCodeGenerator};
pub use rental::{DEFAULT_RENTAL_DAYS, Rental, RentalStatus, StockEffect};
