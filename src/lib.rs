//! # framey - Album and Weather Cards for Picture Frames
//!
//! framey renders fixed-size "cards" for digital and e-paper picture frames:
//! the album that is currently playing (cover art, text, QR codes linking to
//! the album) or today's weather. It provides:
//!
//! - **Link encoding**: QR codes with a badge in the middle
//! - **Document composition**: SVG templates filled from a record
//! - **Rasterization**: resvg, with CSS styling and local image references
//! - **Dithering**: ordered Bayer dithering onto a device palette
//! - **HTTP server**: JPEG endpoints with ETag validation
//!
//! ## Quick Start
//!
//! ```no_run
//! use framey::{
//!     config::RenderSection,
//!     pipeline::CardRenderer,
//!     record::{AlbumRecord, CoverSource},
//! };
//!
//! # async fn example() -> Result<(), framey::FrameyError> {
//! let renderer = CardRenderer::from_config(&RenderSection::default(), reqwest::Client::new())?;
//!
//! let album = AlbumRecord::new(
//!     "Hunky Dory",
//!     "David Bowie",
//!     "1971",
//!     CoverSource::remote("https://example.com/hunky-dory.jpg")?,
//! )
//! .with_primary_link("https://open.spotify.com/album/6fQElzBNTiEMGdIeY0hy5l");
//!
//! let card = renderer.render_album(&album).await?;
//! card.save("card.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`record`] | Normalized album and weather records |
//! | [`links`] | QR link encoding |
//! | [`assets`] | Cover/icon staging in per-render work dirs |
//! | [`document`] | Template filling and markup documents |
//! | [`raster`] | Markup rasterization session |
//! | [`render`] | Card composition and dithering |
//! | [`cache`] | Content tokens and the render cache |
//! | [`display`] | Display targets and palettes |
//! | [`pipeline`] | End-to-end card rendering |
//! | [`sources`] | Album file and forecast API adapters |
//! | [`server`] | HTTP endpoints |
//! | [`config`] | JSON configuration |
//! | [`error`] | Error types |

pub mod assets;
pub mod cache;
pub mod config;
pub mod display;
pub mod document;
pub mod error;
pub mod links;
pub mod logos;
pub mod pipeline;
pub mod raster;
pub mod record;
pub mod render;
pub mod server;
pub mod sources;

// Re-exports for convenience
pub use display::DisplayTarget;
pub use error::FrameyError;
pub use pipeline::CardRenderer;
