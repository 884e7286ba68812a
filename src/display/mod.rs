//! # Display Module
//!
//! Hardware presets and device palettes.
//!
//! ## Modules
//!
//! - [`config`]: Display target presets and card geometry
//! - [`palette`]: Fixed color palettes

pub mod config;
pub mod palette;

pub use config::{CardLayout, DisplayTarget, DitherMode, LinkStyle, Placement};
pub use palette::Palette;
