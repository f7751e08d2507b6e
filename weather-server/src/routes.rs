//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use weather_core::ServerConfig;

use crate::{handlers, rate_limit::RateLimiterLayer, state::AppState};

/// Build the application router.
///
/// Only the chat endpoint is rate limited, by `limiter`. Paths that match no route are served from
/// the static frontend directory, falling back to its `index.html`.
pub fn create_router(
    state: AppState,
    server: &ServerConfig,
    limiter: RateLimiterLayer,
) -> Router {
    let ai = Router::new()
        .route("/api/ai/chat", post(handlers::chat))
        .layer(limiter);

    let frontend = ServeDir::new(&server.static_dir)
        .fallback(ServeFile::new(server.static_dir.join("index.html")));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/timelines", post(handlers::timelines))
        .route("/api/alerts", post(handlers::alerts))
        .merge(ai)
        .fallback_service(frontend)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
