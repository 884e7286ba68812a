//! # Streaming Badge
//!
//! A green disc crossed by three curved sound-wave bands that shorten
//! towards the bottom.

use image::RgbaImage;

use super::rasterize;

const GREEN: [u8; 4] = [30, 215, 96, 255];
const INK: [u8; 4] = [25, 20, 20, 255];

/// Streaming badge generator.
pub struct SpotifyBadge;

impl SpotifyBadge {
    /// Generate the badge image.
    pub fn image() -> RgbaImage {
        rasterize(|dx, dy, r| {
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > r {
                return [0, 0, 0, 0];
            }
            if on_wave(dx, dy, r) { INK } else { GREEN }
        })
    }
}

/// Bands as (vertical position, half width, thickness), relative to the disc radius.
const WAVES: [(f32, f32, f32); 3] = [(-0.30, 0.62, 0.13), (0.02, 0.52, 0.11), (0.30, 0.42, 0.09)];

/// Each band is a slice of a large circle whose center sits below the badge,
/// which gives the arcs their downward droop at the ends.
fn on_wave(dx: f32, dy: f32, r: f32) -> bool {
    let bend = 1.6 * r;
    WAVES.iter().any(|&(pos, half_width, thickness)| {
        if dx.abs() > half_width * r {
            return false;
        }
        let cy = pos * r + bend;
        let d = (dx * dx + (dy - cy) * (dy - cy)).sqrt();
        (d - bend).abs() < thickness * r / 2.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_green_and_ink() {
        let img = SpotifyBadge::image();
        let green = img.pixels().filter(|p| p.0 == GREEN).count();
        let ink = img.pixels().filter(|p| p.0 == INK).count();
        assert!(green > ink, "disc should dominate ({green} vs {ink})");
        assert!(ink > 100, "waves should be visible ({ink})");
    }
}
