//! Message dispatch: render, filter recipients, send.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument, warn};

use movierent_events::EmailMessage;

use crate::templates;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("mail API rejected the request with status {status}: {body}")]
    Api { status: u16, body: String },
}

/// One plain-text email, fully rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Anything that can deliver an [`OutgoingMail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// What happened to one queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Recipient is not on the allow-list.
    Skipped,
    /// Type this relay does not know how to render.
    Unsupported,
}

pub struct MailRelay<T> {
    transport: T,
    allowed_recipients: Vec<String>,
}

impl<T: MailTransport> MailRelay<T> {
    /// `allowed_recipients` must be lowercase; empty allows everyone.
    pub fn new(transport: T, allowed_recipients: Vec<String>) -> Self {
        Self {
            transport,
            allowed_recipients,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_allowed(&self, recipient: &str) -> bool {
        self.allowed_recipients.is_empty()
            || self
                .allowed_recipients
                .iter()
                .any(|r| r.as_str() == recipient.trim().to_lowercase())
    }

    /// Render and send one message. Transport failures are returned to the
    /// caller, which logs them; the message is not retried here.
    #[instrument(skip(self, message), fields(kind = message.kind.as_str()))]
    pub async fn dispatch(&self, message: &EmailMessage) -> Result<Delivery, MailError> {
        let Some(rendered) = templates::render(message) else {
            warn!("unknown email type, skipping");
            return Ok(Delivery::Unsupported);
        };

        if !self.is_allowed(&message.to) {
            info!(to = %message.to, "recipient not in allow-list, skipping");
            return Ok(Delivery::Skipped);
        }

        let mail = OutgoingMail {
            to: message.to.clone(),
            subject: rendered.subject.to_string(),
            body: rendered.body,
        };
        self.transport.send(&mail).await?;

        info!(to = %mail.to, subject = %mail.subject, "email sent");
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingMail>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Api {
                    status: 401,
                    body: "bad key".to_string(),
                });
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn sends_rendered_mail() {
        let relay = MailRelay::new(RecordingTransport::default(), Vec::new());

        let outcome = relay
            .dispatch(&EmailMessage::registration("jane@example.com", "Jane"))
            .await
            .unwrap();

        assert_eq!(outcome, Delivery::Sent);
        let sent = relay.transport().sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jane@example.com");
        assert_eq!(sent[0].body, "Thank you for registering with our Movie Rental Service, Jane.");
    }

    #[tokio::test]
    async fn allow_list_is_case_insensitive() {
        let relay = MailRelay::new(RecordingTransport::default(), vec!["ops@example.com".to_string()]);

        let skipped = relay
            .dispatch(&EmailMessage::registration("jane@example.com", "Jane"))
            .await
            .unwrap();
        let sent = relay
            .dispatch(&EmailMessage::registration("Ops@Example.com", "Ops"))
            .await
            .unwrap();

        assert_eq!(skipped, Delivery::Skipped);
        assert_eq!(sent, Delivery::Sent);
        assert_eq!(relay.transport().sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_types_are_not_sent() {
        let relay = MailRelay::new(RecordingTransport::default(), Vec::new());
        let msg = EmailMessage::from_json(r#"{"to":"a@example.com","type":"NEWSLETTER"}"#).unwrap();

        assert_eq!(relay.dispatch(&msg).await.unwrap(), Delivery::Unsupported);
        assert!(relay.transport().sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_errors_surface() {
        let relay = MailRelay::new(
            RecordingTransport {
                fail: true,
                ..Default::default()
            },
            Vec::new(),
        );

        let err = relay
            .dispatch(&EmailMessage::registration("jane@example.com", "Jane"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Api { status: 401, .. }));
    }
}
