//! The two fixed email texts.

use movierent_events::email::{REGISTRATION_SUBJECT, RENTAL_CONFIRMATION_SUBJECT};
use movierent_events::{EmailKind, EmailMessage};

/// Subject and plain-text body ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: &'static str,
    pub body: String,
}

pub fn registration_body(user_name: &str) -> String {
    format!("Thank you for registering with our Movie Rental Service, {user_name}.")
}

pub fn rental_confirmation_body(user_name: &str, movie_title: &str, rental_code: &str) -> String {
    format!("Dear {user_name}, your rental of '{movie_title}' has been confirmed. Your rental code is: {rental_code}")
}

/// Render by message type; `None` for types this build does not know.
/// Missing optional fields render as empty strings.
pub fn render(message: &EmailMessage) -> Option<Rendered> {
    let field = |v: &Option<String>| v.clone().unwrap_or_default();

    match message.kind {
        EmailKind::Registration => Some(Rendered {
            subject: REGISTRATION_SUBJECT,
            body: registration_body(&field(&message.user_name)),
        }),
        EmailKind::RentalConfirmation => Some(Rendered {
            subject: RENTAL_CONFIRMATION_SUBJECT,
            body: rental_confirmation_body(
                &field(&message.user_name),
                &field(&message.movie_title),
                &field(&message.rental_code),
            ),
        }),
        EmailKind::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies_match_the_fixed_texts() {
        let msg = EmailMessage::rental_confirmation("jane@example.com", "Jane", "Inception", "AB12CD34");
        let rendered = render(&msg).unwrap();
        assert_eq!(rendered.subject, "Movie Rental Confirmation");
        assert_eq!(
            rendered.body,
            "Dear Jane, your rental of 'Inception' has been confirmed. Your rental code is: AB12CD34"
        );

        let rendered = render(&EmailMessage::registration("jane@example.com", "Jane")).unwrap();
        assert_eq!(rendered.subject, "Welcome to Movie Rental Service");
        assert_eq!(rendered.body, "Thank you for registering with our Movie Rental Service, Jane.");
    }

    #[test]
    fn unknown_type_renders_nothing() {
        let msg = EmailMessage::from_json(r#"{"to":"a@example.com","type":"NEWSLETTER"}"#).unwrap();
        assert_eq!(render(&msg), None);
    }
}
