//! # Record Sources
//!
//! Adapters that produce normalized records for the server.
//!
//! | Source | Record | Backing |
//! |--------|--------|---------|
//! | [`FileAlbumSource`] | [`AlbumRecord`] | JSON file (normalized or streaming-service payload) |
//! | [`OpenMeteoSource`] | [`WeatherRecord`] | Open-Meteo forecast API |

pub mod album;
pub mod weather;

pub use album::{AlbumPayload, FileAlbumSource, SpotifyAlbum};
pub use weather::{OpenMeteoSource, beaufort, condition};

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{AlbumRecord, WeatherRecord};

/// Produces the album that is currently playing.
#[async_trait]
pub trait AlbumSource: Send + Sync {
    /// `Ok(None)` when nothing is playing.
    async fn current(&self) -> Result<Option<AlbumRecord>>;
}

/// Produces current weather conditions.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self) -> Result<WeatherRecord>;
}
