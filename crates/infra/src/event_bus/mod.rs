//! Infrastructure-backed email queue transports.
//!
//! The bus abstraction lives in `movierent-events`; this module adds the
//! Redis Streams implementation used in production.

#[cfg(feature = "redis")]
pub mod redis_streams;

#[cfg(feature = "redis")]
pub use redis_streams::{RedisStreamsEventBus, RedisStreamsError};
