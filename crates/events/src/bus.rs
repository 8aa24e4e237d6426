//! Publish/subscribe abstraction (mechanics only).
//!
//! The bus is how the rental API hands notifications to the mailer without
//! knowing whether the transport is an in-process channel or a Redis stream.
//!
//! Delivery is **at-least-once**: a message may show up more than once after a
//! consumer crash, so consumers must tolerate duplicates. Sending the same
//! confirmation email twice is the worst case here, which is acceptable.
//!
//! Durable transports hand messages over through [`acknowledged`]: the
//! transport only forgets a message once the consumer has called
//! [`Subscription::ack`] for it.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::time::Duration;

/// A subscription to a message stream.
///
/// ```ignore
/// let subscription = bus.subscribe();
///
/// loop {
///     match subscription.recv_timeout(Duration::from_secs(1)) {
///         Ok(msg) => relay(msg),
///         Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,  // Check for shutdown
///         Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,  // Bus closed
///     }
/// }
/// ```
///
/// Subscriptions are meant for a single consuming thread. Call
/// [`Self::ack`] once a received message has been handled.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
    acks: Option<Sender<()>>,
}

impl<M> Subscription<M> {
    /// Fire-and-forget subscription: [`Self::ack`] is a no-op.
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver, acks: None }
    }

    /// Confirm the last received message was handled.
    pub fn ack(&self) {
        if let Some(acks) = &self.acks {
            // The producer may already be gone; it will redeliver anyway.
            let _ = acks.send(());
        }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Producer side of an [`acknowledged`] subscription.
#[derive(Debug)]
pub struct Handoff<M> {
    sender: SyncSender<M>,
    acks: Receiver<()>,
}

impl<M> Handoff<M> {
    /// Hand one message to the consumer and block until it is acknowledged.
    ///
    /// Returns `false` when the consumer went away first; the message must
    /// then be treated as unhandled.
    pub fn deliver(&self, message: M) -> bool {
        self.sender.send(message).is_ok() && self.acks.recv().is_ok()
    }
}

/// Rendezvous channel with acknowledgements: at most one message is in
/// flight, and [`Handoff::deliver`] returns only after the consumer acked it.
pub fn acknowledged<M>() -> (Handoff<M>, Subscription<M>) {
    let (sender, receiver) = mpsc::sync_channel(0);
    let (ack_tx, ack_rx) = mpsc::channel();
    (
        Handoff { sender, acks: ack_rx },
        Subscription {
            receiver,
            acks: Some(ack_tx),
        },
    )
}

/// Transport-agnostic message bus.
///
/// `publish()` can fail (broker down, lock poisoned); callers decide whether
/// that failure matters. The rental API logs it and carries on, because a
/// missing email must never roll back a rental.
///
/// Implementations must be `Send + Sync`; many request handlers publish
/// concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
