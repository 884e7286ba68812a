//! # Logo Registry
//!
//! Badges embedded at the center of link QR codes. They are drawn
//! programmatically so the binary carries no image assets.
//!
//! ## Usage
//!
//! ```
//! use framey::logos::LogoKind;
//!
//! let badge = LogoKind::Spotify.image();
//! assert_eq!(badge.dimensions(), (128, 128));
//! ```

pub mod discogs;
pub mod spotify;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

pub use discogs::DiscogsBadge;
pub use spotify::SpotifyBadge;

/// Badge edge length in pixels.
pub const SIZE: u32 = 128;

/// Supersampling factor per axis used for anti-aliased edges.
const SUPERSAMPLE: u32 = 4;

/// The available badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoKind {
    /// Streaming service badge (green disc with sound waves)
    Spotify,
    /// Catalog badge (vinyl record)
    Discogs,
}

impl LogoKind {
    /// Render the badge at [`SIZE`]×[`SIZE`] with a transparent background.
    pub fn image(self) -> RgbaImage {
        match self {
            LogoKind::Spotify => SpotifyBadge::image(),
            LogoKind::Discogs => DiscogsBadge::image(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LogoKind::Spotify => "spotify",
            LogoKind::Discogs => "discogs",
        }
    }
}

/// Rasterize a shader over a square badge with box-filtered supersampling.
///
/// `shade(dx, dy, radius)` gets coordinates relative to the center and
/// returns an RGBA color (alpha 0 = nothing painted).
fn rasterize<F>(shade: F) -> RgbaImage
where
    F: Fn(f32, f32, f32) -> [u8; 4],
{
    let center = SIZE as f32 / 2.0;
    let radius = center - 1.0;
    let samples = SUPERSAMPLE * SUPERSAMPLE;

    RgbaImage::from_fn(SIZE, SIZE, |x, y| {
        let mut acc = [0u32; 4];
        for sy in 0..SUPERSAMPLE {
            for sx in 0..SUPERSAMPLE {
                let px = x as f32 + (sx as f32 + 0.5) / SUPERSAMPLE as f32;
                let py = y as f32 + (sy as f32 + 0.5) / SUPERSAMPLE as f32;
                let c = shade(px - center, py - center, radius);
                let a = c[3] as u32;
                acc[0] += c[0] as u32 * a;
                acc[1] += c[1] as u32 * a;
                acc[2] += c[2] as u32 * a;
                acc[3] += a;
            }
        }
        if acc[3] == 0 {
            return image::Rgba([0, 0, 0, 0]);
        }
        image::Rgba([
            (acc[0] / acc[3]) as u8,
            (acc[1] / acc[3]) as u8,
            (acc[2] / acc[3]) as u8,
            (acc[3] / samples) as u8,
        ])
    })
}
