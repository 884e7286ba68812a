//! # Catalog Badge
//!
//! A black vinyl record: grooved disc, white center label, spindle hole.

use image::RgbaImage;

use super::rasterize;

const VINYL: [u8; 4] = [0, 0, 0, 255];
const GROOVE: [u8; 4] = [90, 90, 90, 255];
const LABEL: [u8; 4] = [255, 255, 255, 255];

/// Catalog badge generator.
pub struct DiscogsBadge;

impl DiscogsBadge {
    /// Generate the badge image.
    pub fn image() -> RgbaImage {
        rasterize(|dx, dy, r| {
            let t = (dx * dx + dy * dy).sqrt() / r;
            match t {
                t if t > 1.0 => [0, 0, 0, 0],
                t if t < 0.06 => VINYL,
                t if t < 0.34 => LABEL,
                t if is_groove(t) => GROOVE,
                _ => VINYL,
            }
        })
    }
}

/// Thin rings between the label and the rim.
fn is_groove(t: f32) -> bool {
    const RINGS: [f32; 4] = [0.48, 0.62, 0.76, 0.90];
    RINGS.iter().any(|ring| (t - ring).abs() < 0.015)
}
