//! Server state and configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::assets::USER_AGENT;
use crate::cache::RenderCache;
use crate::config::FrameyConfig;
use crate::error::{FrameyError, Result};
use crate::pipeline::CardRenderer;
use crate::sources::{AlbumSource, FileAlbumSource, OpenMeteoSource, WeatherSource};

/// Cache key of the album card.
pub const PLAYING_KEY: &str = "playing";

/// Cache key of the weather card.
pub const WEATHER_KEY: &str = "weather";

/// Application state shared across handlers.
pub struct AppState {
    pub renderer: CardRenderer,
    /// `None` disables `/playing.jpeg`
    pub album: Option<Arc<dyn AlbumSource>>,
    /// `None` disables `/weather.jpeg`
    pub weather: Option<Arc<dyn WeatherSource>>,
    pub cache: RenderCache,
}

impl AppState {
    pub fn new(
        renderer: CardRenderer,
        album: Option<Arc<dyn AlbumSource>>,
        weather: Option<Arc<dyn WeatherSource>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            renderer,
            album,
            weather,
            cache: RenderCache::new(cache_ttl),
        }
    }

    /// Wire up the renderer and sources described by `config`. One HTTP
    /// client is shared by asset fetches and the weather source.
    pub fn from_config(config: &FrameyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FrameyError::Config(format!("HTTP client error: {}", e)))?;

        let renderer = CardRenderer::from_config(&config.render, client.clone())?;
        let album = config
            .album
            .as_ref()
            .map(|section| Arc::new(FileAlbumSource::new(&section.path)) as Arc<dyn AlbumSource>);
        let weather = match &config.weather {
            Some(section) => Some(
                Arc::new(OpenMeteoSource::new(client, section)?) as Arc<dyn WeatherSource>
            ),
            None => None,
        };

        Ok(Self::new(renderer, album, weather, config.cache_ttl()))
    }
}
