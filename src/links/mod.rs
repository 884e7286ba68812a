//! # Link Encoder
//!
//! Renders a URL as a high-redundancy QR code with a service badge stamped
//! in the middle, and stages it as a PNG inside the render's work dir.
//!
//! | Setting      | Default | Notes                                    |
//! |--------------|---------|------------------------------------------|
//! | `box_size`   | 10      | Pixels per module                        |
//! | `border`     | 4 / 0   | Quiet zone in modules (portrait / wide)  |
//! | `logo_ratio` | 0.25    | Badge width relative to the symbol       |
//!
//! Error correction is always level H (~30% redundancy), which is what lets
//! the badge cover the center without breaking the scan.

use image::{Rgb, Rgba, RgbaImage, imageops, imageops::FilterType};
use qrcode::{Color, EcLevel, QrCode, types::QrError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assets::{StagedAsset, WorkDir};
use crate::error::{FrameyError, Result};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// QR raster geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QrOptions {
    pub box_size: u32,
    pub border: u32,
    pub logo_ratio: f32,
}

impl QrOptions {
    /// Standard four-module quiet zone.
    pub const fn bordered() -> Self {
        Self {
            box_size: 10,
            border: 4,
            logo_ratio: 0.25,
        }
    }

    /// No quiet zone; the card layout provides the margin.
    pub const fn borderless() -> Self {
        Self {
            box_size: 10,
            border: 0,
            logo_ratio: 0.25,
        }
    }
}

impl Default for QrOptions {
    fn default() -> Self {
        Self::bordered()
    }
}

/// Encode `url` and stage the result.
///
/// Returns `Ok(None)` without touching the work dir when there is no URL.
/// A payload that doesn't fit any symbol version at level H is
/// `EncodingCapacityExceeded`.
pub fn encode(
    url: Option<&str>,
    embed: &RgbaImage,
    tint: Rgb<u8>,
    options: &QrOptions,
    workdir: &WorkDir,
) -> Result<Option<StagedAsset>> {
    let Some(url) = url else {
        return Ok(None);
    };

    let image = render(url, embed, tint, options)?;
    let asset = StagedAsset::new(workdir, workdir.unique_name("qr", "png"));
    image.save_with_format(&asset.path, image::ImageFormat::Png)?;
    debug!(file = %asset.file_name, width = image.width(), "Encoded link");
    Ok(Some(asset))
}

/// Rasterize the QR symbol with the badge overlay.
pub fn render(url: &str, embed: &RgbaImage, tint: Rgb<u8>, options: &QrOptions) -> Result<RgbaImage> {
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::H).map_err(|e| match e {
        QrError::DataTooLong => FrameyError::EncodingCapacityExceeded {
            url: url.to_string(),
        },
        other => FrameyError::Image(format!("QR code generation failed: {}", other)),
    })?;

    let modules = code.width() as u32;
    let cell = options.box_size.max(1);
    let border = options.border;
    let side = (modules + 2 * border) * cell;
    let [r, g, b] = tint.0;
    let ink = Rgba([r, g, b, 255]);

    let colors = code.to_colors();
    let mut img = RgbaImage::from_pixel(side, side, BACKGROUND);
    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let qx = (i as u32) % modules;
        let qy = (i as u32) / modules;
        let x0 = (qx + border) * cell;
        let y0 = (qy + border) * cell;
        for y in y0..y0 + cell {
            for x in x0..x0 + cell {
                img.put_pixel(x, y, ink);
            }
        }
    }

    stamp_logo(&mut img, embed, options.logo_ratio);
    Ok(img)
}

/// Center `logo` on `img`, scaled to `ratio` of its width (at most all of it).
fn stamp_logo(img: &mut RgbaImage, logo: &RgbaImage, ratio: f32) {
    if logo.width() == 0 || logo.height() == 0 || ratio <= 0.0 {
        return;
    }
    let ratio = ratio.min(1.0);
    let target_w = ((img.width() as f32 * ratio) as u32).max(1);
    let target_h = ((target_w as f32 * logo.height() as f32 / logo.width() as f32) as u32).max(1);
    let scaled = imageops::resize(logo, target_w, target_h, FilterType::Lanczos3);
    let x = img.width().saturating_sub(target_w) / 2;
    let y = (img.height().saturating_sub(target_h)) / 2;
    imageops::overlay(img, &scaled, x as i64, y as i64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logos::LogoKind;

    #[test]
    fn test_encode_writes_png() {
        let workdir = WorkDir::create(None).unwrap();
        let asset = encode(
            Some("http://google.com/"),
            &LogoKind::Spotify.image(),
            Rgb([255, 255, 255]),
            &QrOptions::bordered(),
            &workdir,
        )
        .unwrap()
        .unwrap();

        assert!(asset.path.starts_with(workdir.path()));
        assert!(asset.file_name.starts_with("qr-"));
        assert!(asset.size_bytes().unwrap() > 0);
    }

    #[test]
    fn test_no_url_no_file() {
        let workdir = WorkDir::create(None).unwrap();
        let result = encode(
            None,
            &LogoKind::Discogs.image(),
            Rgb([0, 0, 0]),
            &QrOptions::bordered(),
            &workdir,
        )
        .unwrap();
        assert!(result.is_none());
        assert_eq!(std::fs::read_dir(workdir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_oversized_url_is_capacity_error() {
        let url = format!("http://example.com/{}", "a".repeat(4000));
        let err = render(&url, &LogoKind::Spotify.image(), Rgb([0, 0, 0]), &QrOptions::bordered())
            .unwrap_err();
        assert!(matches!(err, FrameyError::EncodingCapacityExceeded { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_border_and_tint() {
        let empty = RgbaImage::new(0, 0);
        let tint = Rgb([46, 189, 89]);
        let bordered = render("http://example.org", &empty, tint, &QrOptions::bordered()).unwrap();
        let borderless = render("http://example.org", &empty, tint, &QrOptions::borderless()).unwrap();

        assert_eq!(bordered.width(), borderless.width() + 80);
        // Quiet zone is background; finder pattern corner is ink
        assert_eq!(bordered.get_pixel(0, 0), &BACKGROUND);
        assert_eq!(borderless.get_pixel(0, 0), &Rgba([46, 189, 89, 255]));
        assert_eq!(bordered.get_pixel(40, 40), &Rgba([46, 189, 89, 255]));
    }

    #[test]
    fn test_logo_covers_center() {
        let logo = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        let img = render("http://example.org", &logo, Rgb([0, 0, 0]), &QrOptions::bordered()).unwrap();
        let c = img.width() / 2;
        assert_eq!(img.get_pixel(c, c), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_oversized_logo_ratio_fills_symbol() {
        let logo = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        let options = QrOptions {
            logo_ratio: 2.5,
            ..QrOptions::bordered()
        };
        let img = render("http://example.org", &logo, Rgb([0, 0, 0]), &options).unwrap();
        let plain = render("http://example.org", &RgbaImage::new(0, 0), Rgb([0, 0, 0]), &options).unwrap();

        assert_eq!(img.dimensions(), plain.dimensions());
        assert_eq!(img.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }
}
