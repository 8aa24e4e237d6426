use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use movierent_infra::QueueWorker;
use movierent_infra::event_bus::RedisStreamsEventBus;
use movierent_mailer::{MailRelay, MailerConfig, SendGridClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    movierent_observability::init("movierent-mailer");

    let config = MailerConfig::from_env().context("invalid configuration")?;

    let transport = SendGridClient::new(&config.sendgrid_api_url, &config.sendgrid_api_key, &config.from_email);
    let relay = Arc::new(MailRelay::new(transport, config.allowed_recipients.clone()));

    let bus = RedisStreamsEventBus::new(&config.redis_url, Some(config.email_stream_key.clone()))
        .context("failed to open redis client")?;
    let subscription = bus.subscribe_with_group(&config.consumer_group, &config.consumer_name);
    info!(
        stream = bus.stream_key(),
        group = %config.consumer_group,
        consumer = %config.consumer_name,
        "mailer consuming email stream"
    );

    // The worker thread drives async sends on this runtime. Failed sends are
    // logged by the worker and not retried.
    let runtime = tokio::runtime::Handle::current();
    let worker = QueueWorker::spawn("mailer", subscription, move |message| {
        runtime.block_on(relay.dispatch(&message)).map(|_| ())
    })
    .context("failed to start mailer worker")?;

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutting down");
    tokio::task::spawn_blocking(move || worker.shutdown())
        .await
        .context("worker shutdown panicked")?;

    Ok(())
}
