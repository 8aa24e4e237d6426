//! Redis Streams-backed email queue (durable, at-least-once delivery).
//!
//! - **Stream key**: `movierent:email` by default, one entry per
//!   [`EmailMessage`], JSON in the `payload` field.
//! - **Consumer groups**: the mailer reads as group `mailer`; each process
//!   is a named consumer within it.
//! - **Redelivery**: entries left pending by a dead consumer are claimed
//!   with XCLAIM once idle longer than the pending timeout.
//! - **Dead-letter stream**: `<stream>:dlq`, for entries delivered more than
//!   `max_retries` times.
//!
//! An entry is XACKed only after the consumer acknowledged it through its
//! [`Subscription`]. Entries read but not yet handled when the consumer stops
//! stay pending and are claimed again later.
//!
//! Entries whose payload is not a valid message are logged, acknowledged and
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadReply};
use tracing::{debug, error, instrument, warn};

use movierent_events::{EmailMessage, EventBus, Handoff, Subscription, acknowledged};

/// Default stream key for outgoing emails.
const DEFAULT_STREAM_KEY: &str = "movierent:email";

/// Default max deliveries before an entry goes to the DLQ.
const DEFAULT_MAX_RETRIES: u64 = 5;

/// Entries pending longer than this are claimed by another consumer.
const DEFAULT_PENDING_TIMEOUT_MS: u64 = 60_000;

/// XREADGROUP BLOCK timeout per poll.
const READ_BLOCK_MS: u64 = 1_000;

/// Entries fetched per poll.
const READ_COUNT: usize = 10;

#[derive(Debug, Clone)]
pub struct RedisStreamsEventBus {
    client: Arc<redis::Client>,
    stream_key: String,
    dlq_key: String,
    max_retries: u64,
    pending_timeout_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RedisStreamsError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// One entry read from the stream, before decoding.
#[derive(Debug, Clone)]
struct StreamEntry {
    id: String,
    payload: Option<String>,
    deliveries: u64,
}

impl StreamEntry {
    fn from_stream_id(entry: &StreamId, deliveries: u64) -> Self {
        Self {
            id: entry.id.clone(),
            payload: entry.get::<String>("payload"),
            deliveries,
        }
    }
}

impl RedisStreamsEventBus {
    /// * `redis_url` - e.g. `redis://localhost:6379`
    /// * `stream_key` - defaults to `movierent:email`; the DLQ is `<stream_key>:dlq`
    pub fn new(redis_url: impl AsRef<str>, stream_key: Option<String>) -> Result<Self, RedisStreamsError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(|e| RedisStreamsError::Connection(e.to_string()))?;
        let stream_key = stream_key.unwrap_or_else(|| DEFAULT_STREAM_KEY.to_string());

        Ok(Self {
            client: Arc::new(client),
            dlq_key: format!("{stream_key}:dlq"),
            stream_key,
            max_retries: DEFAULT_MAX_RETRIES,
            pending_timeout_ms: DEFAULT_PENDING_TIMEOUT_MS,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u64) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    fn connection(&self) -> Result<redis::Connection, RedisStreamsError> {
        self.client
            .get_connection()
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))
    }

    /// Ensure a consumer group exists (idempotent).
    pub fn ensure_consumer_group(&self, group_name: &str) -> Result<(), RedisStreamsError> {
        let mut conn = self.connection()?;

        // MKSTREAM creates the stream if needed; "0" replays anything already
        // queued. BUSYGROUP means the group exists, which is fine.
        let created: redis::RedisResult<String> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(group_name)
            .arg("0")
            .arg("MKSTREAM")
            .query(&mut conn);

        match created {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(RedisStreamsError::Command(format!("XGROUP CREATE failed: {e}"))),
        }
    }

    #[instrument(skip(self, message), fields(stream_key = %self.stream_key, kind = message.kind.as_str()), err)]
    fn publish_sync(&self, message: &EmailMessage) -> Result<(), RedisStreamsError> {
        let payload = message
            .to_json()
            .map_err(|e| RedisStreamsError::Serialization(e.to_string()))?;

        let mut conn = self.connection()?;
        let _: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("type")
            .arg(message.kind.as_str())
            .arg("payload")
            .arg(&payload)
            .query(&mut conn)
            .map_err(|e| RedisStreamsError::Command(format!("XADD failed: {e}")))?;

        Ok(())
    }

    fn acknowledge(&self, conn: &mut redis::Connection, group_name: &str, id: &str) -> Result<(), RedisStreamsError> {
        let _: u64 = redis::cmd("XACK")
            .arg(&self.stream_key)
            .arg(group_name)
            .arg(id)
            .query(conn)
            .map_err(|e| RedisStreamsError::Command(format!("XACK failed: {e}")))?;
        Ok(())
    }

    fn send_to_dlq(&self, conn: &mut redis::Connection, entry: &StreamEntry) -> Result<(), RedisStreamsError> {
        let _: String = redis::cmd("XADD")
            .arg(&self.dlq_key)
            .arg("*")
            .arg("original_message_id")
            .arg(&entry.id)
            .arg("deliveries")
            .arg(entry.deliveries.to_string())
            .arg("failed_at")
            .arg(chrono::Utc::now().to_rfc3339())
            .arg("payload")
            .arg(entry.payload.as_deref().unwrap_or_default())
            .query(conn)
            .map_err(|e| RedisStreamsError::Command(format!("DLQ XADD failed: {e}")))?;

        warn!(message_id = %entry.id, deliveries = entry.deliveries, "email sent to dead-letter stream");
        Ok(())
    }

    /// Claim entries another consumer left pending for too long.
    fn claim_stale(
        &self,
        conn: &mut redis::Connection,
        group_name: &str,
        consumer_name: &str,
    ) -> Result<Vec<StreamEntry>, RedisStreamsError> {
        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.stream_key)
            .arg(group_name)
            .arg("IDLE")
            .arg(self.pending_timeout_ms)
            .arg("-")
            .arg("+")
            .arg(READ_COUNT)
            .query(conn)
            .map_err(|e| RedisStreamsError::Command(format!("XPENDING failed: {e}")))?;

        if pending.ids.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<&str> = pending.ids.iter().map(|p| p.id.as_str()).collect();
        let claimed: StreamClaimReply = redis::cmd("XCLAIM")
            .arg(&self.stream_key)
            .arg(group_name)
            .arg(consumer_name)
            .arg(self.pending_timeout_ms)
            .arg(&ids[..])
            .query(conn)
            .map_err(|e| RedisStreamsError::Command(format!("XCLAIM failed: {e}")))?;

        Ok(claimed
            .ids
            .iter()
            .map(|entry| {
                // XCLAIM bumps the delivery counter by one.
                let deliveries = pending
                    .ids
                    .iter()
                    .find(|p| p.id == entry.id)
                    .map(|p| p.times_delivered as u64 + 1)
                    .unwrap_or(1);
                StreamEntry::from_stream_id(entry, deliveries)
            })
            .collect())
    }

    fn read_new(
        &self,
        conn: &mut redis::Connection,
        group_name: &str,
        consumer_name: &str,
    ) -> Result<Vec<StreamEntry>, RedisStreamsError> {
        // A BLOCK timeout comes back as nil.
        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(group_name)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(READ_COUNT)
            .arg("BLOCK")
            .arg(READ_BLOCK_MS)
            .arg("STREAMS")
            .arg(&self.stream_key)
            .arg(">")
            .query(conn)
            .map_err(|e| RedisStreamsError::Command(format!("XREADGROUP failed: {e}")))?;

        Ok(reply
            .into_iter()
            .flat_map(|r| r.keys)
            .flat_map(|k| k.ids)
            .map(|entry| StreamEntry::from_stream_id(&entry, 1))
            .collect())
    }

    /// Read one batch, decode it and hand it over one entry at a time.
    ///
    /// Returns `false` once the receiving side is gone.
    fn pump(
        &self,
        conn: &mut redis::Connection,
        group_name: &str,
        consumer_name: &str,
        handoff: &Handoff<EmailMessage>,
    ) -> Result<bool, RedisStreamsError> {
        let mut entries = self.claim_stale(conn, group_name, consumer_name)?;
        if entries.is_empty() {
            entries = self.read_new(conn, group_name, consumer_name)?;
        }

        for entry in entries {
            if entry.deliveries > self.max_retries {
                self.send_to_dlq(conn, &entry)?;
                self.acknowledge(conn, group_name, &entry.id)?;
                continue;
            }

            let decoded = entry
                .payload
                .as_deref()
                .ok_or_else(|| "missing payload field".to_string())
                .and_then(|raw| EmailMessage::from_json(raw).map_err(|e| e.to_string()));

            match decoded {
                Ok(message) => {
                    if !handoff.deliver(message) {
                        // Not acknowledged: this entry and the rest of the
                        // batch stay pending and are claimed later.
                        return Ok(false);
                    }
                    self.acknowledge(conn, group_name, &entry.id)?;
                }
                Err(reason) => {
                    warn!(message_id = %entry.id, %reason, "dropping malformed email message");
                    self.acknowledge(conn, group_name, &entry.id)?;
                }
            }
        }
        Ok(true)
    }

    /// Subscribe as `consumer_name` within `group_name`.
    ///
    /// A background thread polls Redis and forwards decoded messages, one at
    /// a time. It reconnects after errors and exits when the subscription is
    /// dropped.
    pub fn subscribe_with_group(&self, group_name: &str, consumer_name: &str) -> Subscription<EmailMessage> {
        if let Err(e) = self.ensure_consumer_group(group_name) {
            error!(group = group_name, error = %e, "failed to create consumer group");
        }

        let (handoff, subscription) = acknowledged();
        let bus = self.clone();
        let group = group_name.to_string();
        let consumer = consumer_name.to_string();

        std::thread::spawn(move || {
            let backoff = Duration::from_secs(1);
            loop {
                let mut conn = match bus.connection() {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "redis unavailable; retrying");
                        std::thread::sleep(backoff);
                        continue;
                    }
                };

                loop {
                    match bus.pump(&mut conn, &group, &consumer, &handoff) {
                        Ok(true) => continue,
                        Ok(false) => {
                            debug!(group = %group, consumer = %consumer, "subscription dropped; stopping poller");
                            return;
                        }
                        Err(e) => {
                            error!(error = %e, "failed to read email stream");
                            std::thread::sleep(backoff);
                            break;
                        }
                    }
                }
            }
        });

        subscription
    }
}

impl EventBus<EmailMessage> for RedisStreamsEventBus {
    type Error = RedisStreamsError;

    fn publish(&self, message: EmailMessage) -> Result<(), Self::Error> {
        self.publish_sync(&message)
    }

    /// Subscribes under a throwaway group; use [`Self::subscribe_with_group`]
    /// for real consumers.
    fn subscribe(&self) -> Subscription<EmailMessage> {
        self.subscribe_with_group("default", &format!("consumer-{}", uuid::Uuid::now_v7()))
    }
}
