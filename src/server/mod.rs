//! # HTTP Server for Card Images
//!
//! Serves the current album and weather cards as JPEG for picture frames
//! that poll a URL.
//!
//! ## Usage
//!
//! ```bash
//! framey serve --config framey.json --listen 0.0.0.0:8080
//! ```
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /playing.jpeg` | album card, `404` when nothing is playing |
//! | `GET /weather.jpeg` | weather card |
//! | `GET /health` | `ok` |
//!
//! Card responses carry a strong `ETag` derived from the JPEG bytes and
//! honor `If-None-Match` with `304 Not Modified`.

mod handlers;
mod state;

pub use state::{AppState, PLAYING_KEY, WEATHER_KEY};

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::FrameyConfig;
use crate::error::{FrameyError, Result};

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/playing.jpeg", get(handlers::cards::playing))
        .route("/weather.jpeg", get(handlers::cards::weather))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl-C.
///
/// ## Example
///
/// ```no_run
/// use framey::config::FrameyConfig;
/// use framey::server::serve;
///
/// # async fn example() -> Result<(), framey::error::FrameyError> {
/// serve(FrameyConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: FrameyConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);
    let renderer = state.renderer.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .map_err(|e| {
            FrameyError::Config(format!(
                "Failed to bind to {}: {}",
                config.server.listen_addr, e
            ))
        })?;

    info!(
        listen = %config.server.listen_addr,
        display = renderer.target().name,
        album = config.album.is_some(),
        weather = config.weather.is_some(),
        "framey HTTP server starting"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    renderer.shutdown();

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
