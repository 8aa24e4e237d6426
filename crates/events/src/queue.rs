//! Publisher seam used by the rental API.

use thiserror::Error;
use tracing::warn;

use crate::bus::EventBus;
use crate::email::EmailMessage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to enqueue email: {0}")]
pub struct QueueError(pub String);

/// Object-safe view of "something that accepts outgoing emails".
///
/// Any [`EventBus<EmailMessage>`] is an `EmailQueue`, which lets the API hold
/// an `Arc<dyn EmailQueue>` regardless of the concrete transport.
pub trait EmailQueue: Send + Sync {
    fn enqueue(&self, message: EmailMessage) -> Result<(), QueueError>;

    /// Enqueue and swallow failures (logged). Notifications are best-effort.
    fn enqueue_best_effort(&self, message: EmailMessage) {
        let kind = message.kind;
        if let Err(err) = self.enqueue(message) {
            warn!(error = %err, ?kind, "email notification dropped");
        }
    }
}

impl<B> EmailQueue for B
where
    B: EventBus<EmailMessage>,
{
    fn enqueue(&self, message: EmailMessage) -> Result<(), QueueError> {
        self.publish(message).map_err(|e| QueueError(format!("{e:?}")))
    }
}
