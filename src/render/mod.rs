//! # Rendering Module
//!
//! Pixel-level stages of the card pipeline.
//!
//! ## Modules
//!
//! - [`card`]: Cover + info panel composition onto the final canvas
//! - [`dither`]: Ordered Bayer dithering onto a fixed device palette
//!
//! ## Usage Example
//!
//! ```
//! use framey::display::DisplayTarget;
//! use framey::render::{card, dither};
//! use image::{DynamicImage, RgbImage, RgbaImage};
//!
//! let target = DisplayTarget::widescreen();
//! let cover = DynamicImage::ImageRgb8(RgbImage::new(640, 640));
//! let info = RgbaImage::new(800, 480);
//!
//! let composed = card::compose(&cover, &info, &target.layout);
//! let palette = target.palette.as_ref().unwrap();
//! let quantized = dither::quantize(
//!     &DynamicImage::ImageRgb8(composed),
//!     palette,
//!     target.matrix_order,
//! ).unwrap();
//! assert_eq!(quantized.dimensions(), (800, 480));
//! ```

pub mod card;
pub mod dither;
