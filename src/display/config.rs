//! # Display Targets
//!
//! This module defines the hardware presets a card can be rendered for.
//!
//! ## Supported Targets
//!
//! | Name | Canvas | Cover | Info panel | Palette |
//! |------|--------|-------|------------|---------|
//! | portrait | 600×900 | 600×600 @ (0,0) | 550×250 @ (25,625) | full color |
//! | widescreen | 800×480 | 480×480 @ (0,0) | 800×480 @ (0,0) | 7 colors, dithered cover |
//!
//! ## Usage
//!
//! ```
//! use framey::display::DisplayTarget;
//!
//! let target = DisplayTarget::widescreen();
//! assert_eq!(target.layout.canvas, (800, 480));
//! assert!(target.palette.is_some());
//! ```

use image::Rgb;
use serde::{Deserialize, Serialize};

use super::Palette;
use crate::links::QrOptions;
use crate::logos::LogoKind;

/// A rectangle on the canvas: size and top-left offset, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub size: (u32, u32),
    pub offset: (u32, u32),
}

impl Placement {
    pub const fn new(size: (u32, u32), offset: (u32, u32)) -> Self {
        Self { size, offset }
    }
}

/// Geometry of a composed album card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardLayout {
    /// Final canvas size
    pub canvas: (u32, u32),
    /// Canvas fill color
    pub background: Rgb<u8>,
    /// Where the (square) cover goes
    pub cover: Placement,
    /// Where the rasterized info panel goes
    pub info: Placement,
}

/// Where palette quantization is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DitherMode {
    /// Full color output.
    #[default]
    Off,
    /// Only the staged cover is quantized, before it is composited.
    Cover,
    /// The final canvas is quantized.
    Card,
}

/// Logo and foreground tint of one link slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStyle {
    pub logo: LogoKind,
    pub tint: Rgb<u8>,
}

/// A hardware preset.
#[derive(Debug, Clone)]
pub struct DisplayTarget {
    /// Preset name (used on the command line and in config files)
    pub name: &'static str,
    /// Album card geometry
    pub layout: CardLayout,
    /// Weather cards are a single panel
    pub weather_panel: Placement,
    /// Device palette, if the display is color limited
    pub palette: Option<Palette>,
    /// Where quantization happens (ignored without a palette)
    pub dither: DitherMode,
    /// Bayer matrix order
    pub matrix_order: usize,
    /// Per-channel spread of the dither threshold
    pub channel_divisor: f32,
    /// Template file names inside the template set
    pub album_template: &'static str,
    pub album_stylesheet: &'static str,
    pub weather_template: &'static str,
    pub weather_stylesheet: &'static str,
    /// Characters per wrapped text line in the album panel
    pub wrap_columns: usize,
    /// QR rendering options for both link slots
    pub qr: QrOptions,
    /// Streaming link
    pub primary_link: LinkStyle,
    /// Catalog link
    pub secondary_link: LinkStyle,
}

impl DisplayTarget {
    /// # Portrait card
    ///
    /// 600×900 full-color card: the cover fills the top 600×600 and a
    /// 550×250 text panel sits below it. QR codes keep the legacy 4-module
    /// quiet zone.
    pub fn portrait() -> Self {
        Self {
            name: "portrait",
            layout: CardLayout {
                canvas: (600, 900),
                background: Rgb([255, 255, 255]),
                cover: Placement::new((600, 600), (0, 0)),
                info: Placement::new((550, 250), (25, 625)),
            },
            weather_panel: Placement::new((600, 900), (0, 0)),
            palette: None,
            dither: DitherMode::Off,
            matrix_order: 8,
            channel_divisor: 64.0,
            album_template: "album-portrait.svg.mustache",
            album_stylesheet: "album.css",
            weather_template: "weather-portrait.svg.mustache",
            weather_stylesheet: "weather.css",
            wrap_columns: 18,
            qr: QrOptions::bordered(),
            primary_link: LinkStyle {
                logo: LogoKind::Spotify,
                tint: Rgb([46, 189, 89]),
            },
            secondary_link: LinkStyle {
                logo: LogoKind::Discogs,
                tint: Rgb([0, 0, 0]),
            },
        }
    }

    /// # Widescreen e-paper frame
    ///
    /// 800×480 seven-color panel (7.3" class). The cover occupies the left
    /// square; the info panel covers the whole canvas with a transparent
    /// background so text and codes land to the right of the cover.
    pub fn widescreen() -> Self {
        Self {
            name: "widescreen",
            layout: CardLayout {
                canvas: (800, 480),
                background: Rgb([255, 255, 255]),
                cover: Placement::new((480, 480), (0, 0)),
                info: Placement::new((800, 480), (0, 0)),
            },
            weather_panel: Placement::new((800, 480), (0, 0)),
            palette: Some(Palette::seven_color()),
            dither: DitherMode::Cover,
            matrix_order: 8,
            channel_divisor: 64.0,
            album_template: "album-widescreen.svg.mustache",
            album_stylesheet: "album.css",
            weather_template: "weather-widescreen.svg.mustache",
            weather_stylesheet: "weather.css",
            wrap_columns: 18,
            qr: QrOptions::borderless(),
            primary_link: LinkStyle {
                logo: LogoKind::Spotify,
                tint: Rgb([0, 255, 0]),
            },
            secondary_link: LinkStyle {
                logo: LogoKind::Discogs,
                tint: Rgb([0, 0, 0]),
            },
        }
    }

    /// Look up a preset by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "portrait" => Some(Self::portrait()),
            "widescreen" => Some(Self::widescreen()),
            _ => None,
        }
    }

    /// Names of all presets.
    pub fn list() -> &'static [&'static str] {
        &["portrait", "widescreen"]
    }

    /// Palette to apply to the staged cover, if any.
    pub fn cover_palette(&self) -> Option<&Palette> {
        match self.dither {
            DitherMode::Cover => self.palette.as_ref(),
            _ => None,
        }
    }

    /// Palette to apply to the finished card, if any.
    pub fn card_palette(&self) -> Option<&Palette> {
        match self.dither {
            DitherMode::Card => self.palette.as_ref(),
            _ => None,
        }
    }
}

impl Default for DisplayTarget {
    fn default() -> Self {
        Self::widescreen()
    }
}
