//! `movierent-mailer`: relays queued [`EmailMessage`]s to an email API.
//!
//! The rental API only publishes JSON messages to the email stream; this
//! service renders the final text and hands it to a [`MailTransport`]
//! (SendGrid in production).
//!
//! [`EmailMessage`]: movierent_events::EmailMessage

pub mod config;
pub mod relay;
pub mod sendgrid;
pub mod templates;

pub use config::{MailerConfig, MailerConfigError};
pub use relay::{Delivery, MailError, MailRelay, MailTransport, OutgoingMail};
pub use sendgrid::SendGridClient;
