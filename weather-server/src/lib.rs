//! HTTP backend for the weather dashboard.
//!
//! Serves the JSON API (`/api/timelines`, `/api/alerts`, `/api/ai/chat`), a health probe,
//! and the static browser frontend.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use weather_core::{
    ChatModel, Config, Dashboard, Geocoder, NominatimGeocoder, OpenAiChat, ProviderId,
    TimelineProvider, provider::timeline_provider_from_config,
};

pub use error::ApiError;
pub use rate_limit::{RateLimiterLayer, RateLimiterState, spawn_cleanup_task};
pub use state::AppState;

/// Wire the upstream clients described by `config` into a `Dashboard`.
pub fn dashboard_from_config(config: &Config) -> anyhow::Result<Dashboard> {
    let timelines: Arc<dyn TimelineProvider> = Arc::from(timeline_provider_from_config(config)?);
    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(config.geocoder.clone())?);

    let chat = match config.provider_api_key(ProviderId::OpenAi) {
        Some(key) => {
            let chat: Arc<dyn ChatModel> =
                Arc::new(OpenAiChat::new(key.to_owned(), config.chat.clone())?);
            Some(chat)
        }
        None => None,
    };

    Ok(Dashboard::new(timelines, geocoder, chat, config.cache))
}

/// Run the server until ctrl-c.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    for id in ProviderId::all() {
        if config.is_provider_configured(*id) {
            info!(provider = %id, "API key loaded");
        } else {
            warn!(provider = %id, env = id.env_var(), "API key missing");
        }
    }

    let state = AppState::new(dashboard_from_config(&config)?);
    let limiter = RateLimiterLayer::new(&config.server.rate_limit);
    let cleanup = config.server.rate_limit.enabled.then(|| {
        spawn_cleanup_task(
            limiter.state(),
            Duration::from_secs(config.server.rate_limit.window_secs),
        )
    });
    let app = routes::create_router(state, &config.server, limiter);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        static_dir = %config.server.static_dir.display(),
        "Server listening on http://{addr}"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    if let Some(cleanup) = cleanup {
        cleanup.abort();
    }
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
