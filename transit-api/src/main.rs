use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transit_api::{app, state::{AppState, AuthConfig}};
use transit_order::PendingBookingReaper;
use transit_store::app_config::{Config, StoreBackend};
use transit_store::{BroadcastPush, InMemoryStore, RedisStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transit_api=debug,transit_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting transit API on port {}", config.server.port);

    let push = BroadcastPush::new(config.push.channel_capacity);
    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.token_lifetime()?,
    };

    let (state, events) = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            AppState::build(Arc::new(InMemoryStore::new()), push, auth)
        }
        StoreBackend::Redis => {
            let url = config
                .store
                .redis_url
                .as_deref()
                .context("store.redis_url is required for the redis backend")?;
            let store = RedisStore::new(url)
                .await
                .context("Failed to connect to Redis")?;
            AppState::build(Arc::new(store), push, auth)
        }
    };

    tokio::spawn(state.notifications.clone().run(events));

    if let Some(ttl) = config.business_rules.pending_booking_ttl()? {
        let reaper = PendingBookingReaper::new(
            state.engine.clone(),
            ttl,
            Duration::from_secs(config.business_rules.reaper_interval_seconds.max(1)),
        );
        tokio::spawn(reaper.run());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
