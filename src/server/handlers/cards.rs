//! Card endpoints.
//!
//! Both routes share one flow:
//!
//! 1. A fresh cached render answers directly: `304` when the client's
//!    `If-None-Match` names it, the cached bytes otherwise.
//! 2. Otherwise the source is queried and the card rendered.
//! 3. The new token is cached and compared against the client validator
//!    again, since an identical re-render still means "not modified".
//!
//! Failures are `500` with a plain-text body and are never cached.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use image::RgbImage;
use tracing::{debug, error};

use crate::assets::run_blocking;
use crate::cache::{self, CacheToken, CachedCard};
use crate::error::Result;

use super::super::state::{AppState, PLAYING_KEY, WEATHER_KEY};

/// GET /playing.jpeg - Album card for whatever is playing.
pub async fn playing(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(source) = state.album.clone() else {
        return (StatusCode::NOT_FOUND, "Album source not configured").into_response();
    };
    let renderer = state.renderer.clone();

    card_response(&state, PLAYING_KEY, &headers, || async move {
        match source.current().await? {
            Some(album) => renderer.render_album(&album).await.map(Some),
            None => Ok(None),
        }
    })
    .await
}

/// GET /weather.jpeg - Current conditions card.
pub async fn weather(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(source) = state.weather.clone() else {
        return (StatusCode::NOT_FOUND, "Weather source not configured").into_response();
    };
    let renderer = state.renderer.clone();

    card_response(&state, WEATHER_KEY, &headers, || async move {
        let weather = source.current().await?;
        renderer.render_weather(&weather).await.map(Some)
    })
    .await
}

async fn card_response<F, Fut>(state: &AppState, key: &str, headers: &HeaderMap, render: F) -> Response
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<RgbImage>>>,
{
    let client = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());

    if let Some(cached) = state.cache.fresh(key).await {
        debug!(key, token = %cached.token, "Serving from render cache");
        return if cache::should_render(client, Some(&cached.token)) {
            jpeg(cached)
        } else {
            not_modified(&cached.token)
        };
    }

    let card = match render().await {
        Ok(Some(card)) => card,
        Ok(None) => return (StatusCode::NOT_FOUND, "Nothing playing").into_response(),
        Err(e) => return internal_error(key, e),
    };

    let (bytes, token) = match run_blocking(move || cache::token_for(&card)).await {
        Ok(encoded) => encoded,
        Err(e) => return internal_error(key, e),
    };
    let cached = CachedCard::new(bytes, token);
    state.cache.store(key, cached.clone()).await;

    if cache::should_render(client, Some(&cached.token)) {
        jpeg(cached)
    } else {
        not_modified(&cached.token)
    }
}

fn jpeg(card: CachedCard) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::ETAG, card.token.etag()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        card.jpeg,
    )
        .into_response()
}

fn not_modified(token: &CacheToken) -> Response {
    (
        StatusCode::NOT_MODIFIED,
        [
            (header::ETAG, token.etag()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
    )
        .into_response()
}

fn internal_error(key: &str, e: crate::error::FrameyError) -> Response {
    error!(key, error = %e, "Render failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Render failed: {}", e),
    )
        .into_response()
}
