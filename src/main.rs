//! OpenSASE Monetization Gateway
//!
//! Serves the admission pipeline in front of the internal API.

use anyhow::Context;
use sase_monetization_gateway::clock::SystemClock;
use sase_monetization_gateway::config::GatewayConfig;
use sase_monetization_gateway::counter::RedisCounterStore;
use sase_monetization_gateway::store::InMemoryStore;
use sase_monetization_gateway::{build_router, GatewayState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("GATEWAY_CONFIG").ok();
    let config = GatewayConfig::load(config_path.as_deref()).context("loading configuration")?;

    let counters = RedisCounterStore::connect(&config.redis.counter_config())
        .await
        .with_context(|| format!("connecting to redis at {}", config.redis.url))?;

    // Seeded tiers and customers; any CustomerStore + UsageSink can be wired here
    let store = Arc::new(InMemoryStore::seeded());

    let state = GatewayState::new(&config, store, Arc::new(counters), Arc::new(SystemClock))
        .context("building gateway state")?;
    let app = build_router(state);

    tracing::info!(
        addr = %config.server.bind_addr,
        upstream = %config.internal_api.base_url,
        "Monetization gateway listening"
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
