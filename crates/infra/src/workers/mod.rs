//! Background workers.

pub mod queue_worker;
