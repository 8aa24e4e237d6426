//! `movierent-events`: the email notification contract and the bus it
//! travels on.
//!
//! The rental API publishes [`EmailMessage`]s; the mailer service consumes
//! them. Both sides only agree on the JSON shape defined in [`email`].

pub mod bus;
pub mod email;
pub mod in_memory_bus;
pub mod queue;

pub use bus::{EventBus, Handoff, Subscription, acknowledged};
pub use email::{EmailKind, EmailMessage};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use queue::{EmailQueue, QueueError};
