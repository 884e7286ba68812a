//! HTTP handlers for the server.

pub mod cards;

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
