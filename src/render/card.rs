//! Card composition: cover + info panel onto a fixed-size canvas.

use image::{DynamicImage, Rgba, RgbImage, RgbaImage, imageops, imageops::FilterType};
use tracing::debug;

use crate::display::{CardLayout, Placement};

/// Compose an album card.
///
/// The cover is resized to the layout's square (aspect ratio is not kept)
/// and pasted opaque; the info panel is alpha-composited on top, so only its
/// painted areas cover the artwork. Output is always `layout.canvas` sized.
pub fn compose(cover: &DynamicImage, info: &RgbaImage, layout: &CardLayout) -> RgbImage {
    let mut canvas = blank(layout);

    let (cw, ch) = layout.cover.size;
    // A cover staged at its final size (e.g. already quantized) is pasted as-is.
    let resized = if (cover.width(), cover.height()) == (cw, ch) {
        cover.to_rgba8()
    } else {
        cover.resize_exact(cw, ch, FilterType::Lanczos3).to_rgba8()
    };
    let (x, y) = layout.cover.offset;
    imageops::replace(&mut canvas, &resized, x as i64, y as i64);

    paste_panel(&mut canvas, info, &layout.info);
    debug!(
        width = layout.canvas.0,
        height = layout.canvas.1,
        "Composed album card"
    );
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Compose a card that only has an info panel (weather).
pub fn compose_panel(info: &RgbaImage, layout: &CardLayout, panel: &Placement) -> RgbImage {
    let mut canvas = blank(layout);
    paste_panel(&mut canvas, info, panel);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

fn blank(layout: &CardLayout) -> RgbaImage {
    let [r, g, b] = layout.background.0;
    RgbaImage::from_pixel(layout.canvas.0, layout.canvas.1, Rgba([r, g, b, 255]))
}

fn paste_panel(canvas: &mut RgbaImage, info: &RgbaImage, panel: &Placement) {
    // Panels are rasterized at their placement size; anything else is scaled to fit the slot.
    let (pw, ph) = panel.size;
    let (x, y) = panel.offset;
    if info.dimensions() == (pw, ph) {
        imageops::overlay(canvas, info, x as i64, y as i64);
    } else {
        let scaled = imageops::resize(info, pw, ph, FilterType::Triangle);
        imageops::overlay(canvas, &scaled, x as i64, y as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayTarget;
    use image::Rgb;

    fn solid(w: u32, h: u32, c: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(c)))
    }

    #[test]
    fn test_output_size_ignores_cover_aspect() {
        for target in [DisplayTarget::portrait(), DisplayTarget::widescreen()] {
            let layout = target.layout;
            let info = RgbaImage::new(layout.info.size.0, layout.info.size.1);
            for (w, h) in [(1, 1), (640, 480), (300, 1200), (3000, 3000)] {
                let card = compose(&solid(w, h, [10, 20, 30]), &info, &layout);
                assert_eq!(card.dimensions(), layout.canvas, "{} {w}x{h}", target.name);
            }
        }
    }

    #[test]
    fn test_transparent_panel_keeps_cover_visible() {
        let layout = DisplayTarget::widescreen().layout;
        let info = RgbaImage::new(800, 480); // fully transparent
        let card = compose(&solid(100, 100, [200, 0, 0]), &info, &layout);
        assert_eq!(card.get_pixel(10, 10), &Rgb([200, 0, 0]));
        // Right of the cover is background
        assert_eq!(card.get_pixel(700, 10), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_opaque_panel_pixels_win() {
        let layout = DisplayTarget::widescreen().layout;
        let mut info = RgbaImage::new(800, 480);
        info.put_pixel(20, 20, Rgba([0, 0, 255, 255]));
        let card = compose(&solid(100, 100, [200, 0, 0]), &info, &layout);
        assert_eq!(card.get_pixel(20, 20), &Rgb([0, 0, 255]));
        assert_eq!(card.get_pixel(21, 20), &Rgb([200, 0, 0]));
    }

    #[test]
    fn test_portrait_panel_offset() {
        let layout = DisplayTarget::portrait().layout;
        let info = RgbaImage::from_pixel(550, 250, Rgba([0, 0, 0, 255]));
        let card = compose(&solid(10, 10, [255, 255, 0]), &info, &layout);
        assert_eq!(card.get_pixel(300, 300), &Rgb([255, 255, 0]));
        assert_eq!(card.get_pixel(25, 625), &Rgb([0, 0, 0]));
        assert_eq!(card.get_pixel(24, 625), &Rgb([255, 255, 255]));
        assert_eq!(card.get_pixel(300, 610), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_deterministic() {
        let layout = DisplayTarget::portrait().layout;
        let info = RgbaImage::from_fn(550, 250, |x, y| Rgba([x as u8, y as u8, 0, (x % 256) as u8]));
        let cover = solid(123, 77, [1, 2, 3]);
        let a = compose(&cover, &info, &layout);
        let b = compose(&cover, &info, &layout);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_compose_panel_scales_mismatched_panel() {
        let target = DisplayTarget::widescreen();
        let info = RgbaImage::from_pixel(400, 240, Rgba([0, 0, 0, 255]));
        let card = compose_panel(&info, &target.layout, &target.weather_panel);
        assert_eq!(card.dimensions(), (800, 480));
        assert_eq!(card.get_pixel(799, 479), &Rgb([0, 0, 0]));
    }
}
