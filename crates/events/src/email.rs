//! Email notification message (queue wire format).
//!
//! Serialized as JSON with camelCase keys, e.g.
//!
//! ```json
//! {
//!   "to": "jane@example.com",
//!   "subject": "Movie Rental Confirmation",
//!   "body": "Your movie rental has been confirmed.",
//!   "type": "RENTAL_CONFIRMATION",
//!   "userName": "Jane Smith",
//!   "movieTitle": "Inception",
//!   "rentalCode": "7QK2ZB1M"
//! }
//! ```

use serde::{Deserialize, Serialize};

pub const REGISTRATION_SUBJECT: &str = "Welcome to Movie Rental Service";
pub const RENTAL_CONFIRMATION_SUBJECT: &str = "Movie Rental Confirmation";

/// Which template the mailer should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailKind {
    Registration,
    RentalConfirmation,
    /// Any type this build does not know about. Consumers skip it.
    #[serde(other)]
    Unknown,
}

impl EmailKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailKind::Registration => "REGISTRATION",
            EmailKind::RentalConfirmation => "RENTAL_CONFIRMATION",
            EmailKind::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "type")]
    pub kind: EmailKind,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub movie_title: Option<String>,
    #[serde(default)]
    pub rental_code: Option<String>,
}

impl EmailMessage {
    /// Welcome message sent after a successful registration.
    pub fn registration(to: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: REGISTRATION_SUBJECT.to_string(),
            body: "Thank you for registering with our Movie Rental Service.".to_string(),
            kind: EmailKind::Registration,
            user_name: Some(user_name.into()),
            movie_title: None,
            rental_code: None,
        }
    }

    /// Confirmation sent once a rental has been ordered.
    pub fn rental_confirmation(
        to: impl Into<String>,
        user_name: impl Into<String>,
        movie_title: impl Into<String>,
        rental_code: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: RENTAL_CONFIRMATION_SUBJECT.to_string(),
            body: "Your movie rental has been confirmed.".to_string(),
            kind: EmailKind::RentalConfirmation,
            user_name: Some(user_name.into()),
            movie_title: Some(movie_title.into()),
            rental_code: Some(rental_code.into()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rental_confirmation_uses_camel_case_keys() {
        let msg = EmailMessage::rental_confirmation("jane@example.com", "Jane", "Inception", "AB12CD34");
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "RENTAL_CONFIRMATION");
        assert_eq!(value["userName"], "Jane");
        assert_eq!(value["movieTitle"], "Inception");
        assert_eq!(value["rentalCode"], "AB12CD34");
        assert_eq!(value["subject"], RENTAL_CONFIRMATION_SUBJECT);
    }

    #[test]
    fn registration_leaves_rental_fields_empty() {
        let msg = EmailMessage::registration("john@example.com", "John");
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "REGISTRATION");
        assert!(value["movieTitle"].is_null());
        assert!(value["rentalCode"].is_null());
    }

    #[test]
    fn unknown_type_parses_as_unknown() {
        let msg = EmailMessage::from_json(r#"{"to":"x@example.com","type":"NEWSLETTER"}"#).unwrap();
        assert_eq!(msg.kind, EmailKind::Unknown);
        assert!(msg.subject.is_empty());
        assert_eq!(msg.user_name, None);
    }

    #[test]
    fn missing_recipient_is_rejected() {
        assert!(EmailMessage::from_json(r#"{"type":"REGISTRATION"}"#).is_err());
    }
}
