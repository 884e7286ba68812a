//! # Ordered Palette Dithering
//!
//! This module reduces full-color images to a small fixed palette (e.g. the
//! seven inks of an ACeP e-paper panel) using ordered Bayer dithering.
//!
//! ## Ordered Dithering
//!
//! Flat nearest-color mapping turns gradients into visible bands. Ordered
//! dithering nudges each pixel by a position-dependent offset before snapping
//! it to the palette, so neighbouring pixels land on different entries and the
//! eye averages them back into intermediate tones.
//!
//! For each pixel at (x, y) and each channel c:
//!
//! ```text
//! m      = M[y mod n][x mod n]              (Bayer matrix of order n)
//! offset = ((m + 0.5) / n² - 0.5) * divisor_c
//! v'_c   = clamp(v_c + offset, 0, 255)
//! out    = nearest palette entry to (v'_r, v'_g, v'_b)
//! ```
//!
//! The offset is centered on zero, so the spread is `±divisor/2`.
//!
//! ## The Bayer Matrix
//!
//! Matrices of any power-of-two order are built recursively:
//!
//! ```text
//! M(1)  = [0]
//! M(2n) = | 4·M(n) + 0   4·M(n) + 2 |
//!         | 4·M(n) + 3   4·M(n) + 1 |
//! ```
//!
//! Order 8 gives the classic table:
//!
//! ```text
//!     0   1   2   3   4   5   6   7   (x mod 8)
//!   ┌───┬───┬───┬───┬───┬───┬───┬───┐
//! 0 │ 0 │32 │ 8 │40 │ 2 │34 │10 │42 │
//! 1 │48 │16 │56 │24 │50 │18 │58 │26 │
//! 2 │12 │44 │ 4 │36 │14 │46 │ 6 │38 │
//! 3 │60 │28 │52 │20 │62 │30 │54 │22 │
//! 4 │ 3 │35 │11 │43 │ 1 │33 │ 9 │41 │
//! 5 │51 │19 │59 │27 │49 │17 │57 │25 │
//! 6 │15 │47 │ 7 │39 │13 │45 │ 5 │37 │
//! 7 │63 │31 │55 │23 │61 │29 │53 │21 │
//!   └───┴───┴───┴───┴───┴───┴───┴───┘
//! (y mod 8)
//! ```
//!
//! ## Usage Example
//!
//! ```
//! use framey::display::Palette;
//! use framey::render::dither;
//! use image::{DynamicImage, Rgb, RgbImage};
//!
//! let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 255, 255])));
//! let out = dither::quantize(&white, &Palette::seven_color(), 8).unwrap();
//! assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
//! ```

use image::{DynamicImage, Rgb, RgbImage};
use rayon::prelude::*;
use tracing::debug;

use crate::display::Palette;
use crate::error::{FrameyError, Result};

/// Bayer 8x8 dithering matrix
///
/// Values range from 0-63. Equal to `bayer_matrix(8)`.
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Default per-channel spread (256 / 4), as used for 8-order matrices.
pub const DEFAULT_DIVISOR: f32 = 64.0;

/// Largest supported matrix order.
const MAX_ORDER: usize = 64;

/// Build a Bayer matrix of the given order, row-major.
///
/// `order` must be a power of two between 1 and 64.
pub fn bayer_matrix(order: usize) -> Result<Vec<u32>> {
    if order == 0 || !order.is_power_of_two() || order > MAX_ORDER {
        return Err(FrameyError::PaletteQuantization(format!(
            "matrix order must be a power of two in 1..={MAX_ORDER}, got {order}"
        )));
    }

    let mut matrix = vec![0u32];
    let mut n = 1;
    while n < order {
        let next = n * 2;
        let mut grown = vec![0u32; next * next];
        for y in 0..n {
            for x in 0..n {
                let v = 4 * matrix[y * n + x];
                grown[y * next + x] = v;
                grown[y * next + x + n] = v + 2;
                grown[(y + n) * next + x] = v + 3;
                grown[(y + n) * next + x + n] = v + 1;
            }
        }
        matrix = grown;
        n = next;
    }
    Ok(matrix)
}

/// Precomputed per-cell offsets for one matrix order.
struct ThresholdMap {
    order: usize,
    /// Centered offsets in [-0.5, 0.5), row-major
    offsets: Vec<f32>,
}

impl ThresholdMap {
    fn new(order: usize) -> Result<Self> {
        let cells = (order * order) as f32;
        let offsets = bayer_matrix(order)?
            .into_iter()
            .map(|m| (m as f32 + 0.5) / cells - 0.5)
            .collect();
        Ok(Self { order, offsets })
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> f32 {
        // order is a power of two
        let mask = self.order - 1;
        self.offsets[(y & mask) * self.order + (x & mask)]
    }
}

/// Quantize an image to `palette` with the default channel divisor.
pub fn quantize(image: &DynamicImage, palette: &Palette, order: usize) -> Result<RgbImage> {
    quantize_with(image, palette, order, [DEFAULT_DIVISOR; 3])
}

/// Quantize an image to `palette` with ordered dithering.
///
/// Every pixel of the result is exactly one of `palette`'s entries. The
/// output depends only on the arguments.
///
/// ## Errors
///
/// `PaletteQuantization` for an empty image, an empty palette, a bad matrix
/// order, or a non-finite/negative divisor.
pub fn quantize_with(
    image: &DynamicImage,
    palette: &Palette,
    order: usize,
    divisors: [f32; 3],
) -> Result<RgbImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(FrameyError::PaletteQuantization(format!(
            "cannot quantize an empty {}x{} bitmap",
            image.width(),
            image.height()
        )));
    }
    if palette.is_empty() {
        return Err(FrameyError::PaletteQuantization(
            "palette has no colors".to_string(),
        ));
    }
    if divisors.iter().any(|d| !d.is_finite() || *d < 0.0) {
        return Err(FrameyError::PaletteQuantization(format!(
            "invalid channel divisors {divisors:?}"
        )));
    }

    let map = ThresholdMap::new(order)?;
    // Whatever the source color mode, threshold in 8-bit RGB.
    let source = image.to_rgb8();
    let (width, height) = source.dimensions();
    debug!(width, height, order, colors = palette.len(), "Quantizing bitmap");

    let row_len = width as usize * 3;
    let mut out = vec![0u8; row_len * height as usize];

    out.par_chunks_mut(row_len)
        .zip(source.as_raw().par_chunks(row_len))
        .enumerate()
        .for_each(|(y, (dst, src))| {
            for x in 0..width as usize {
                let t = map.offset(x, y);
                let i = x * 3;
                let r = (src[i] as f32 + t * divisors[0]).clamp(0.0, 255.0);
                let g = (src[i + 1] as f32 + t * divisors[1]).clamp(0.0, 255.0);
                let b = (src[i + 2] as f32 + t * divisors[2]).clamp(0.0, 255.0);
                // Non-empty palette checked above.
                if let Some(Rgb(c)) = palette.nearest(r, g, b) {
                    dst[i..i + 3].copy_from_slice(&c);
                }
            }
        });

    RgbImage::from_raw(width, height, out).ok_or_else(|| {
        FrameyError::PaletteQuantization("quantized buffer size mismatch".to_string())
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) * 127 / (width + height).max(1)) as u8,
            ])
        }))
    }

    #[test]
    fn test_bayer_matrix_order_8_matches_table() {
        let m = bayer_matrix(8).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(m[y * 8 + x], BAYER8[y][x] as u32, "at ({x},{y})");
            }
        }
    }

    #[test]
    fn test_bayer_matrix_is_permutation() {
        for order in [1, 2, 4, 16] {
            let mut m = bayer_matrix(order).unwrap();
            m.sort_unstable();
            let expected: Vec<u32> = (0..(order * order) as u32).collect();
            assert_eq!(m, expected, "order {order}");
        }
    }

    #[test]
    fn test_bayer_matrix_rejects_bad_order() {
        assert!(bayer_matrix(0).is_err());
        assert!(bayer_matrix(3).is_err());
        assert!(bayer_matrix(128).is_err());
    }

    #[test]
    fn test_threshold_offsets_centered() {
        let map = ThresholdMap::new(8).unwrap();
        let sum: f32 = map.offsets.iter().sum();
        assert!(sum.abs() < 1e-4);
        assert!(map.offsets.iter().all(|t| *t > -0.5 && *t < 0.5));
        // Periodic
        assert_eq!(map.offset(3, 5), map.offset(11, 13));
    }

    #[test]
    fn test_white_pixel_stays_white() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 255, 255])));
        let out = quantize(&white, &Palette::seven_color(), 8).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0xFF, 0xFF, 0xFF]));
    }

    #[test]
    fn test_black_pixel_stays_black() {
        let black = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([0, 0, 0])));
        let out = quantize(&black, &Palette::seven_color(), 8).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_solid_fills_stay_solid() {
        let palette = Palette::seven_color();
        for &color in palette.colors() {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, color));
            let out = quantize(&img, &palette, 8).unwrap();
            assert!(out.pixels().all(|p| *p == color), "{color:?}");
        }
    }

    #[test]
    fn test_output_only_contains_palette_colors() {
        let palette = Palette::seven_color();
        for order in [2, 4, 8] {
            let out = quantize(&gradient(67, 41), &palette, order).unwrap();
            assert_eq!(out.dimensions(), (67, 41));
            assert!(out.pixels().all(|p| palette.contains(p)), "order {order}");
        }
    }

    #[test]
    fn test_deterministic() {
        let img = gradient(50, 30);
        let palette = Palette::seven_color();
        let a = quantize(&img, &palette, 8).unwrap();
        let b = quantize(&img, &palette, 8).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_gray_dithers_to_mixed_pattern() {
        let gray = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([128, 128, 128])));
        let out = quantize_with(&gray, &Palette::black_and_white(), 8, [256.0; 3]).unwrap();
        let white = out.pixels().filter(|p| p[0] == 255).count();
        // Roughly half the cells should light up
        assert!((24..=40).contains(&white), "got {white} white pixels");
    }

    #[test]
    fn test_zero_divisor_is_nearest_color() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 30, 20])));
        let out = quantize_with(&img, &Palette::seven_color(), 8, [0.0; 3]).unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([255, 0, 0])));
    }

    #[test]
    fn test_accepts_other_color_modes() {
        let palette = Palette::seven_color();
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(5, 5, Luma([255])));
        let out = quantize(&gray, &palette, 8).unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([255, 255, 255])));

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 255])));
        let out = quantize(&rgba, &palette, 8).unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_rejects_malformed_input() {
        let palette = Palette::seven_color();
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(matches!(
            quantize(&empty, &palette, 8),
            Err(FrameyError::PaletteQuantization(_))
        ));

        let img = gradient(4, 4);
        assert!(quantize(&img, &Palette::new(Vec::new()), 8).is_err());
        assert!(quantize(&img, &palette, 6).is_err());
        assert!(quantize_with(&img, &palette, 8, [f32::NAN, 64.0, 64.0]).is_err());
    }
}
