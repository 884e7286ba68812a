//! Album records from a JSON file.
//!
//! The file is re-read on every request, so whatever keeps it up to date
//! (a player hook, a cron job polling the streaming service) is decoupled
//! from rendering. Accepted shapes:
//!
//! ```json
//! {"title": "…", "artist": "…", "year": "1971", "cover": "https://…/cover.jpg",
//!  "primary_link": "https://open.spotify.com/album/…", "secondary_link": null, "credits": null}
//! ```
//!
//! or a Spotify album object, a currently-playing payload (`{"item": {"album": …}}`)
//! or a recently-played page (`{"items": [{"track": {"album": …}}]}`).
//! `null`, `{"item": null}` and a missing file all mean nothing is playing.
//!
//! A normalized `cover` that isn't an http(s) URL is read as an image path,
//! relative to the JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::AlbumSource;
use crate::assets::run_blocking;
use crate::error::{FrameyError, Result};
use crate::record::{AlbumRecord, CoverSource};

/// Album in the crate's own shape.
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizedAlbum {
    pub title: String,
    pub artist: String,
    pub year: String,
    pub cover: String,
    #[serde(default)]
    pub primary_link: Option<String>,
    #[serde(default)]
    pub secondary_link: Option<String>,
    #[serde(default)]
    pub credits: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

/// The subset of a Spotify album object that a card needs.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    pub artists: Vec<SpotifyArtist>,
    pub images: Vec<SpotifyImage>,
    pub release_date: String,
    #[serde(default)]
    pub external_urls: SpotifyUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub album: SpotifyAlbum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentItem {
    pub track: SpotifyTrack,
}

/// Everything the album file may contain.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AlbumPayload {
    Normalized(NormalizedAlbum),
    Spotify(SpotifyAlbum),
    Recent { items: Vec<RecentItem> },
    /// `item` must be present; only an explicit `null` means idle.
    Playing {
        #[serde(deserialize_with = "required_nullable")]
        item: Option<SpotifyTrack>,
    },
}

// With `deserialize_with` and no `default`, a missing field is an error
// instead of silently becoming `None`.
fn required_nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

impl SpotifyAlbum {
    /// Normalize: first image as cover, artists joined with ", ", year from
    /// the release date, album page as the primary link.
    pub fn to_record(&self) -> Result<AlbumRecord> {
        let cover = self
            .images
            .first()
            .ok_or_else(|| FrameyError::Source(format!("album '{}' has no images", self.name)))?;
        let artist = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let year: String = self.release_date.chars().take(4).collect();

        let mut record = AlbumRecord::new(&self.name, artist, year, CoverSource::remote(&cover.url)?);
        record.primary_link_url = self.external_urls.spotify.clone();
        Ok(record)
    }
}

impl AlbumPayload {
    /// The album to show, if any.
    pub fn into_spotify(self) -> Option<SpotifyAlbum> {
        match self {
            AlbumPayload::Spotify(album) => Some(album),
            AlbumPayload::Playing { item } => item.map(|t| t.album),
            AlbumPayload::Recent { items } => items.into_iter().next().map(|i| i.track.album),
            AlbumPayload::Normalized(_) => None,
        }
    }
}

/// Reads the current album from a JSON file.
#[derive(Debug, Clone)]
pub struct FileAlbumSource {
    path: PathBuf,
}

impl FileAlbumSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse file contents into a record.
    pub async fn parse(&self, raw: &str) -> Result<Option<AlbumRecord>> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let payload: Option<AlbumPayload> = serde_json::from_str(raw).map_err(|e| {
            FrameyError::Source(format!("{}: unrecognized album JSON: {}", self.path.display(), e))
        })?;

        match payload {
            None => Ok(None),
            Some(AlbumPayload::Normalized(album)) => self.normalized(album).await.map(Some),
            Some(other) => other.into_spotify().map(|a| a.to_record()).transpose(),
        }
    }

    async fn normalized(&self, album: NormalizedAlbum) -> Result<AlbumRecord> {
        let cover = if album.cover.starts_with("http://") || album.cover.starts_with("https://") {
            CoverSource::remote(&album.cover)?
        } else {
            let base = self.path.parent().unwrap_or(Path::new("."));
            load_cover_file(base.join(&album.cover)).await?
        };

        let mut record = AlbumRecord::new(album.title, album.artist, album.year, cover);
        record.primary_link_url = album.primary_link;
        record.secondary_link_url = album.secondary_link;
        record.credits = album.credits;
        Ok(record)
    }
}

#[async_trait]
impl AlbumSource for FileAlbumSource {
    async fn current(&self) -> Result<Option<AlbumRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No album file; nothing playing");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        self.parse(&raw).await
    }
}

/// Decode a local cover image.
pub async fn load_cover_file(path: PathBuf) -> Result<CoverSource> {
    run_blocking(move || {
        let image = image::ImageReader::open(&path)?
            .with_guessed_format()?
            .decode()?;
        Ok(CoverSource::Decoded(image))
    })
    .await
}
