//! # Device Palettes
//!
//! A palette is the ordered set of colors a display can physically show.
//! Quantization snaps every pixel to one of these entries.

use image::Rgb;

/// An ordered, fixed set of RGB colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb<u8>>,
}

impl Palette {
    /// Build a palette from explicit colors.
    pub fn new(colors: Vec<Rgb<u8>>) -> Self {
        Self { colors }
    }

    /// Build a palette from `0xRRGGBB` values.
    pub fn from_hex(values: &[u32]) -> Self {
        Self {
            colors: values
                .iter()
                .map(|&v| Rgb([(v >> 16) as u8, (v >> 8) as u8, v as u8]))
                .collect(),
        }
    }

    /// The 7-color ACeP e-paper palette (Inky Frame class panels).
    ///
    /// | Index | Color  | Hex     |
    /// |-------|--------|---------|
    /// | 0     | black  | #000000 |
    /// | 1     | white  | #FFFFFF |
    /// | 2     | green  | #00FF00 |
    /// | 3     | blue   | #0000FF |
    /// | 4     | red    | #FF0000 |
    /// | 5     | yellow | #FFFF00 |
    /// | 6     | orange | #FF8000 |
    pub fn seven_color() -> Self {
        Self::from_hex(&[
            0x000000, 0xFFFFFF, 0x00FF00, 0x0000FF, 0xFF0000, 0xFFFF00, 0xFF8000,
        ])
    }

    /// Two-color palette, mostly useful in tests.
    pub fn black_and_white() -> Self {
        Self::from_hex(&[0x000000, 0xFFFFFF])
    }

    pub fn colors(&self) -> &[Rgb<u8>] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn contains(&self, color: &Rgb<u8>) -> bool {
        self.colors.contains(color)
    }

    /// Nearest entry by squared RGB distance. Ties go to the earliest entry.
    ///
    /// Returns `None` only for an empty palette.
    #[inline]
    pub fn nearest(&self, r: f32, g: f32, b: f32) -> Option<Rgb<u8>> {
        let mut best: Option<(f32, Rgb<u8>)> = None;
        for &color in &self.colors {
            let dr = r - color[0] as f32;
            let dg = g - color[1] as f32;
            let db = b - color[2] as f32;
            let dist = dr * dr + dg * dg + db * db;
            match best {
                Some((d, _)) if d <= dist => {}
                _ => best = Some((dist, color)),
            }
        }
        best.map(|(_, c)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_channel_order() {
        let p = Palette::from_hex(&[0xFF8000]);
        assert_eq!(p.colors(), &[Rgb([0xFF, 0x80, 0x00])]);
    }

    #[test]
    fn test_seven_color_entries_are_distinct() {
        let p = Palette::seven_color();
        assert_eq!(p.len(), 7);
        for (i, a) in p.colors().iter().enumerate() {
            for b in &p.colors()[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(p.contains(&Rgb([255, 0, 0])));
    }

    #[test]
    fn test_nearest_picks_closest() {
        let p = Palette::seven_color();
        assert_eq!(p.nearest(250.0, 10.0, 5.0), Some(Rgb([255, 0, 0])));
        assert_eq!(p.nearest(240.0, 130.0, 10.0), Some(Rgb([255, 128, 0])));
        assert_eq!(p.nearest(20.0, 20.0, 20.0), Some(Rgb([0, 0, 0])));
    }

    #[test]
    fn test_nearest_tie_prefers_first() {
        let p = Palette::from_hex(&[0x000000, 0x202020]);
        assert_eq!(p.nearest(16.0, 16.0, 16.0), Some(Rgb([0, 0, 0])));
    }

    #[test]
    fn test_nearest_empty() {
        assert_eq!(Palette::new(Vec::new()).nearest(0.0, 0.0, 0.0), None);
    }
}
