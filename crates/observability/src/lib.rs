//! Shared tracing setup for the API and mailer binaries.

pub mod tracing;

pub use crate::tracing::{LogFormat, init, init_with};
