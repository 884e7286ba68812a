//! # Normalized Records
//!
//! The data a card is rendered from. Sources (streaming/catalog/weather
//! adapters) produce these; the pipeline only ever sees these types.

use std::fmt;

use chrono::NaiveDateTime;
use image::DynamicImage;
use reqwest::Url;

use crate::error::{FrameyError, Result};

/// Where the cover art comes from.
#[derive(Clone)]
pub enum CoverSource {
    /// Must be fetched over HTTP.
    Remote(Url),
    /// Already decoded, no network access needed.
    Decoded(DynamicImage),
}

impl fmt::Debug for CoverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverSource::Remote(url) => f.debug_tuple("Remote").field(&url.as_str()).finish(),
            CoverSource::Decoded(img) => f
                .debug_tuple("Decoded")
                .field(&format_args!("{}x{}", img.width(), img.height()))
                .finish(),
        }
    }
}

impl CoverSource {
    /// Parse a remote cover URL.
    pub fn remote(url: &str) -> Result<Self> {
        Url::parse(url)
            .map(CoverSource::Remote)
            .map_err(|e| FrameyError::Config(format!("invalid cover URL '{url}': {e}")))
    }
}

/// An album, ready to be rendered.
#[derive(Debug, Clone)]
pub struct AlbumRecord {
    pub title: String,
    pub artist: String,
    pub year: String,
    pub cover: CoverSource,
    /// Streaming link (QR code with the streaming badge)
    pub primary_link_url: Option<String>,
    /// Catalog link (QR code with the record badge)
    pub secondary_link_url: Option<String>,
    pub credits: Option<String>,
}

impl AlbumRecord {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        year: impl Into<String>,
        cover: CoverSource,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            year: year.into(),
            cover,
            primary_link_url: None,
            secondary_link_url: None,
            credits: None,
        }
    }

    pub fn with_primary_link(mut self, url: impl Into<String>) -> Self {
        self.primary_link_url = Some(url.into());
        self
    }

    pub fn with_secondary_link(mut self, url: impl Into<String>) -> Self {
        self.secondary_link_url = Some(url.into());
        self
    }

    pub fn with_credits(mut self, credits: impl Into<String>) -> Self {
        self.credits = Some(credits.into());
        self
    }
}

/// Current conditions plus today's forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    /// Today's (min, max) temperature
    pub temperature_range: (f64, f64),
    pub current_temp: f64,
    pub wind_speed: f64,
    /// Beaufort number, 0..=12
    pub wind_scale_index: u8,
    /// Hourly precipitation, starting at midnight today
    pub precipitation_series: Vec<f64>,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
    pub condition_label: String,
    pub condition_icon_url: Option<Url>,
    pub location: String,
    /// Display unit, e.g. "°C"
    pub temperature_unit: String,
    /// Display unit, e.g. "km/h"
    pub wind_unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_builder_sets_optional_links() {
        let album = AlbumRecord::new(
            "Engigstciak",
            "Daniel Case",
            "2000",
            CoverSource::remote("http://example.com/cover.jpeg").unwrap(),
        )
        .with_primary_link("http://example.org");

        assert_eq!(album.primary_link_url.as_deref(), Some("http://example.org"));
        assert!(album.secondary_link_url.is_none());
        assert!(album.credits.is_none());
    }

    #[test]
    fn test_cover_debug_is_compact() {
        let cover = CoverSource::Decoded(DynamicImage::ImageRgb8(RgbImage::new(3, 2)));
        assert_eq!(format!("{cover:?}"), "Decoded(3x2)");
        let cover = CoverSource::remote("http://example.com/a.png").unwrap();
        assert_eq!(format!("{cover:?}"), "Remote(\"http://example.com/a.png\")");
    }

    #[test]
    fn test_remote_rejects_garbage() {
        assert!(CoverSource::remote("not a url").is_err());
    }
}
