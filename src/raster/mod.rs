//! # Rasterizer
//!
//! Renders a [`MarkupDocument`] to an RGBA bitmap of an exact size using
//! `resvg`. The markup's work dir is the resource root, so `href="qr-….png"`
//! resolves to the staged file next to it. Nothing in the markup executes.
//!
//! ## Session lifecycle
//!
//! ```text
//!   Idle ──first rasterize──▶ Ready(fontdb) ──release()──▶ Released
//!     └────────────────────release()──────────────────────────┘
//! ```
//!
//! Loading the font database is the expensive part, so it happens once per
//! session and is shared by every render afterwards. Rasterizations are
//! serialized through the session lock.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use tracing::{debug, info, warn};
use usvg::fontdb::Database;

use crate::document::MarkupDocument;
use crate::error::{FrameyError, Result};

/// Font sources for a session.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Extra `.ttf`/`.otf`/`.ttc` files to load
    pub fonts_dir: Option<PathBuf>,
    /// Load the fonts installed on the system
    pub load_system_fonts: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            fonts_dir: None,
            load_system_fonts: true,
        }
    }
}

enum SessionState {
    Idle,
    Ready(Arc<Database>),
    Released,
}

/// A long-lived rendering session shared by all renders.
pub struct RasterSession {
    options: RasterOptions,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for RasterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSession")
            .field("options", &self.options)
            .field("released", &self.is_released())
            .finish()
    }
}

impl RasterSession {
    pub fn new(options: RasterOptions) -> Self {
        Self {
            options,
            state: Mutex::new(SessionState::Idle),
        }
    }

    /// Render `doc` at exactly `size` pixels.
    ///
    /// The SVG user space is scaled to fill the target, so templates can be
    /// authored at any viewBox.
    pub fn rasterize(&self, doc: &MarkupDocument, size: (u32, u32)) -> Result<RgbaImage> {
        let mut state = self.lock()?;
        let fontdb = match &*state {
            SessionState::Released => {
                return Err(FrameyError::RasterizationUnavailable(
                    "session has been released".to_string(),
                ));
            }
            SessionState::Ready(db) => Some(Arc::clone(db)),
            SessionState::Idle => None,
        };
        let fontdb = match fontdb {
            Some(db) => db,
            None => {
                let db = Arc::new(self.load_fonts());
                *state = SessionState::Ready(Arc::clone(&db));
                db
            }
        };

        let started = Instant::now();
        let markup = doc.read_markup().map_err(|e| {
            FrameyError::RasterizationUnavailable(format!(
                "cannot read {}: {}",
                doc.markup.display(),
                e
            ))
        })?;
        let stylesheet = doc.read_stylesheet().map_err(|e| {
            FrameyError::RasterizationUnavailable(format!(
                "cannot read {}: {}",
                doc.stylesheet.display(),
                e
            ))
        })?;

        let opts = usvg::Options {
            resources_dir: Some(doc.dir.clone()),
            fontdb,
            style_sheet: Some(stylesheet),
            ..Default::default()
        };
        let tree = usvg::Tree::from_data(markup.as_bytes(), &opts)
            .map_err(|e| FrameyError::InvalidMarkup(e.to_string()))?;

        let (width, height) = size;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            FrameyError::RasterizationUnavailable(format!(
                "cannot allocate {}x{} pixmap",
                width, height
            ))
        })?;
        let sx = width as f32 / tree.size().width();
        let sy = height as f32 / tree.size().height();
        resvg::render(&tree, Transform::from_scale(sx, sy), &mut pixmap.as_mut());
        drop(state);

        let image = to_rgba(&pixmap);
        debug!(
            width,
            height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rasterized markup"
        );
        Ok(image)
    }

    /// Tear the session down. Later rasterizations fail.
    pub fn release(&self) {
        match self.state.lock() {
            Ok(mut state) => {
                if !matches!(*state, SessionState::Released) {
                    *state = SessionState::Released;
                    info!("Raster session released");
                }
            }
            Err(poisoned) => *poisoned.into_inner() = SessionState::Released,
        }
    }

    pub fn is_released(&self) -> bool {
        match self.state.lock() {
            Ok(state) => matches!(*state, SessionState::Released),
            Err(_) => true,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.state.lock().map_err(|_| {
            FrameyError::RasterizationUnavailable("session lock poisoned".to_string())
        })
    }

    fn load_fonts(&self) -> Database {
        let started = Instant::now();
        let mut db = Database::new();
        if self.options.load_system_fonts {
            db.load_system_fonts();
        }
        if let Some(dir) = &self.options.fonts_dir {
            db.load_fonts_dir(dir);
        }

        let faces = db.len();
        if faces == 0 {
            warn!("No fonts found; card text will not be drawn");
        }
        info!(
            faces,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Raster session ready"
        );
        db
    }
}

impl Default for RasterSession {
    fn default() -> Self {
        Self::new(RasterOptions::default())
    }
}

/// Un-premultiply the pixmap into a straight-alpha image.
fn to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::WorkDir;
    use crate::document::{Fields, Template, compose};

    fn session() -> RasterSession {
        RasterSession::new(RasterOptions {
            fonts_dir: None,
            load_system_fonts: false,
        })
    }

    fn doc(workdir: &WorkDir, svg: &str, css: &str) -> MarkupDocument {
        compose(&Fields::new(), &Template::parse(svg).unwrap(), css, workdir).unwrap()
    }

    #[test]
    fn test_exact_size_and_stylesheet() {
        let workdir = WorkDir::create(None).unwrap();
        let doc = doc(
            &workdir,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10"><rect class="box" x="0" y="0" width="5" height="10"/></svg>"#,
            ".box { fill: #ff0000; }",
        );

        let img = session().rasterize(&doc, (40, 20)).unwrap();
        assert_eq!(img.dimensions(), (40, 20));
        assert_eq!(img.get_pixel(5, 10), &Rgba([255, 0, 0, 255]));
        // Right half untouched: transparent
        assert_eq!(img.get_pixel(35, 10)[3], 0);
    }

    #[test]
    fn test_relative_image_resolves_in_workdir() {
        let workdir = WorkDir::create(None).unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]))
            .save(workdir.join("qr-test.png"))
            .unwrap();
        let doc = doc(
            &workdir,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="20" height="20"><image x="0" y="0" width="20" height="20" xlink:href="qr-test.png"/></svg>"#,
            "",
        );

        let img = session().rasterize(&doc, (20, 20)).unwrap();
        assert_eq!(img.get_pixel(10, 10), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_malformed_markup() {
        let workdir = WorkDir::create(None).unwrap();
        let doc = doc(&workdir, "<svg><rect></svg>", "");
        let err = session().rasterize(&doc, (10, 10)).unwrap_err();
        assert!(matches!(err, FrameyError::InvalidMarkup(_)), "{err}");
    }

    #[test]
    fn test_missing_markup_is_unavailable() {
        let workdir = WorkDir::create(None).unwrap();
        let doc = MarkupDocument {
            dir: workdir.path().to_path_buf(),
            markup: workdir.join("index.svg"),
            stylesheet: workdir.join("style.css"),
        };
        let err = session().rasterize(&doc, (10, 10)).unwrap_err();
        assert!(matches!(err, FrameyError::RasterizationUnavailable(_)));
    }

    #[test]
    fn test_released_session_refuses() {
        let workdir = WorkDir::create(None).unwrap();
        let doc = doc(
            &workdir,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect width="2" height="2"/></svg>"#,
            "",
        );
        let session = session();
        session.rasterize(&doc, (4, 4)).unwrap();
        assert!(!session.is_released());

        session.release();
        session.release();
        assert!(session.is_released());
        let err = session.rasterize(&doc, (4, 4)).unwrap_err();
        assert!(matches!(err, FrameyError::RasterizationUnavailable(_)));
    }

    #[test]
    fn test_zero_size_is_unavailable() {
        let workdir = WorkDir::create(None).unwrap();
        let doc = doc(
            &workdir,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect width="2" height="2"/></svg>"#,
            "",
        );
        let err = session().rasterize(&doc, (0, 4)).unwrap_err();
        assert!(matches!(err, FrameyError::RasterizationUnavailable(_)));
    }
}
