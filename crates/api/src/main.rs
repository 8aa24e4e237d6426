use std::sync::Arc;

use anyhow::Context;

use movierent_infra::{AppConfig, seed_demo_data};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    movierent_observability::init("movierent-api");

    let config = AppConfig::from_env().context("invalid configuration")?;

    let services = movierent_api::app::services::build_services(&config)
        .await
        .context("failed to build services")?;

    if config.seed_demo_data {
        let seeded = seed_demo_data(services.store.as_ref(), services.bcrypt_cost)
            .await
            .context("failed to seed demo data")?;
        if seeded {
            tracing::info!("demo data seeded");
        }
    }

    let app = movierent_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
