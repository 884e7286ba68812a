//! # Card Pipeline
//!
//! Drives one record through every stage and hands back the finished card:
//!
//! ```text
//! record ─▶ WorkDir ─▶ resolve assets ─┬─▶ encode links (2 slots, parallel)
//!                      (async, I/O)    └─▶ compose markup ─▶ rasterize
//!                                            ─▶ compose card ─▶ quantize?
//! ```
//!
//! Asset resolution runs on the async runtime; everything CPU bound runs on
//! the blocking pool, bounded by the raster timeout. Each render owns its
//! [`WorkDir`], which is removed when the render finishes, fails or is
//! abandoned by the timeout.
//!
//! ## Degradation
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Link too long for a QR code | slot left empty |
//! | Weather icon fetch fails | icon left out |
//! | Cover fetch fails | render aborted (`FetchFailed`) |
//! | Rasterizer unavailable / timeout | render aborted |

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{DynamicImage, RgbImage};
use tracing::{debug, info, warn};

use crate::assets::{AssetResolver, CoverDither, StagedAsset, WorkDir, run_blocking};
use crate::config::RenderSection;
use crate::display::{DisplayTarget, LinkStyle};
use crate::document::{self, AlbumAssets, Template, TemplateSet};
use crate::error::{FrameyError, Result};
use crate::links;
use crate::raster::RasterSession;
use crate::record::{AlbumRecord, WeatherRecord};
use crate::render::{card, dither};

/// Per-render filesystem and time limits.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Parent of per-render work dirs (system temp dir if unset)
    pub work_root: Option<PathBuf>,
    /// Copy each work dir here before it is removed
    pub keep_workdir: Option<PathBuf>,
    /// Upper bound on the blocking part of a render
    pub raster_timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            work_root: None,
            keep_workdir: None,
            raster_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&RenderSection> for RenderOptions {
    fn from(section: &RenderSection) -> Self {
        Self {
            work_root: section.work_root.clone(),
            keep_workdir: section.keep_workdir.clone(),
            raster_timeout: section.raster_timeout(),
        }
    }
}

struct Inner {
    target: DisplayTarget,
    session: Arc<RasterSession>,
    resolver: AssetResolver,
    album_template: Template,
    album_stylesheet: String,
    weather_template: Template,
    weather_stylesheet: String,
    options: RenderOptions,
}

/// Renders album and weather cards for one display target.
///
/// Cheap to clone; clones share the raster session.
#[derive(Clone)]
pub struct CardRenderer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CardRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardRenderer")
            .field("target", &self.inner.target.name)
            .field("session", &self.inner.session)
            .field("options", &self.inner.options)
            .finish()
    }
}

impl CardRenderer {
    /// Build a renderer, parsing the target's templates up front so template
    /// errors surface at startup rather than on the first request.
    pub fn new(
        target: DisplayTarget,
        templates: &TemplateSet,
        options: RenderOptions,
        session: Arc<RasterSession>,
        resolver: AssetResolver,
    ) -> Result<Self> {
        let inner = Inner {
            album_template: templates.template(target.album_template)?,
            album_stylesheet: templates.source(target.album_stylesheet)?,
            weather_template: templates.template(target.weather_template)?,
            weather_stylesheet: templates.source(target.weather_stylesheet)?,
            target,
            session,
            resolver,
            options,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Build a renderer from the `render` config section.
    pub fn from_config(section: &RenderSection, client: reqwest::Client) -> Result<Self> {
        let templates = match &section.templates_dir {
            Some(dir) => TemplateSet::with_overrides(dir),
            None => TemplateSet::embedded(),
        };
        Self::new(
            section.display_target()?,
            &templates,
            RenderOptions::from(section),
            Arc::new(RasterSession::new(section.raster_options())),
            AssetResolver::with_client(client),
        )
    }

    pub fn target(&self) -> &DisplayTarget {
        &self.inner.target
    }

    pub fn options(&self) -> &RenderOptions {
        &self.inner.options
    }

    /// Release the raster session. Later renders fail with
    /// `RasterizationUnavailable`.
    pub fn shutdown(&self) {
        self.inner.session.release();
    }

    /// Render an album card.
    ///
    /// ## Errors
    ///
    /// - `FetchFailed` when the cover can't be retrieved
    /// - `RasterizationUnavailable` on session loss or timeout
    /// - `InvalidMarkup` when a template produces unparsable markup
    pub async fn render_album(&self, album: &AlbumRecord) -> Result<RgbImage> {
        let started = Instant::now();
        let target = &self.inner.target;
        let workdir = WorkDir::create(self.inner.options.work_root.as_deref())?;

        let cover_dither = target.cover_palette().map(|palette| CoverDither {
            palette: palette.clone(),
            order: target.matrix_order,
            divisor: target.channel_divisor,
            size: target.layout.cover.size,
        });
        let cover = self
            .inner
            .resolver
            .resolve(&album.cover, &workdir, cover_dither.as_ref())
            .await?;

        let inner = Arc::clone(&self.inner);
        let album = album.clone();
        let card = self
            .bounded(move || inner.album_card(&album, cover, workdir))
            .await?;

        info!(
            display = target.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered album card"
        );
        Ok(card)
    }

    /// Render a weather card. A missing or broken condition icon is left out.
    pub async fn render_weather(&self, weather: &WeatherRecord) -> Result<RgbImage> {
        let started = Instant::now();
        let workdir = WorkDir::create(self.inner.options.work_root.as_deref())?;

        let icon = match &weather.condition_icon_url {
            Some(url) => match self.inner.resolver.fetch(url, &workdir, "icon").await {
                Ok(icon) => Some(icon),
                Err(e) => {
                    warn!(error = %e, "Weather icon unavailable; rendering without it");
                    None
                }
            },
            None => None,
        };

        let inner = Arc::clone(&self.inner);
        let weather = weather.clone();
        let card = self
            .bounded(move || inner.weather_card(&weather, icon, workdir))
            .await?;

        info!(
            display = self.inner.target.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered weather card"
        );
        Ok(card)
    }

    /// Run the blocking stage under the raster timeout.
    ///
    /// On timeout the task keeps running detached; it still owns the work
    /// dir and removes it when it ends.
    async fn bounded<F>(&self, stage: F) -> Result<RgbImage>
    where
        F: FnOnce() -> Result<RgbImage> + Send + 'static,
    {
        let timeout = self.inner.options.raster_timeout;
        match tokio::time::timeout(timeout, run_blocking(stage)).await {
            Ok(result) => result,
            Err(_) => Err(FrameyError::RasterizationUnavailable(format!(
                "render exceeded {}s",
                timeout.as_secs_f32()
            ))),
        }
    }
}

impl Inner {
    fn album_card(&self, album: &AlbumRecord, cover: StagedAsset, workdir: WorkDir) -> Result<RgbImage> {
        let target = &self.target;
        let (primary, secondary) = rayon::join(
            || self.link_slot(album.primary_link_url.as_deref(), &target.primary_link, &workdir),
            || self.link_slot(album.secondary_link_url.as_deref(), &target.secondary_link, &workdir),
        );

        let assets = AlbumAssets {
            cover: cover.file_name.clone(),
            primary_qr: primary?.map(|a| a.file_name),
            secondary_qr: secondary?.map(|a| a.file_name),
        };
        let fields = document::album_fields(album, &assets, target.wrap_columns);
        let doc = document::compose(&fields, &self.album_template, &self.album_stylesheet, &workdir)?;
        let info = self.session.rasterize(&doc, target.layout.info.size)?;

        let card = card::compose(&cover.load()?, &info, &target.layout);
        let card = self.finish(card)?;
        self.keep(&workdir)?;
        Ok(card)
    }

    fn weather_card(
        &self,
        weather: &WeatherRecord,
        icon: Option<StagedAsset>,
        workdir: WorkDir,
    ) -> Result<RgbImage> {
        let target = &self.target;
        let fields = document::weather_fields(weather, icon.as_ref().map(|i| i.file_name.as_str()));
        let doc = document::compose(
            &fields,
            &self.weather_template,
            &self.weather_stylesheet,
            &workdir,
        )?;
        let info = self.session.rasterize(&doc, target.weather_panel.size)?;

        let card = card::compose_panel(&info, &target.layout, &target.weather_panel);
        let card = self.finish(card)?;
        self.keep(&workdir)?;
        Ok(card)
    }

    /// Encode one link slot; a link that can't be encoded leaves the slot empty.
    fn link_slot(
        &self,
        url: Option<&str>,
        style: &LinkStyle,
        workdir: &WorkDir,
    ) -> Result<Option<StagedAsset>> {
        let logo = style.logo.image();
        match links::encode(url, &logo, style.tint, &self.target.qr, workdir) {
            Err(e) if e.is_recoverable() => {
                warn!(logo = style.logo.name(), error = %e, "Skipping link code");
                Ok(None)
            }
            other => other,
        }
    }

    /// Quantize the whole card when the target asks for it.
    fn finish(&self, card: RgbImage) -> Result<RgbImage> {
        let target = &self.target;
        match target.card_palette() {
            Some(palette) => dither::quantize_with(
                &DynamicImage::ImageRgb8(card),
                palette,
                target.matrix_order,
                [target.channel_divisor; 3],
            ),
            None => Ok(card),
        }
    }

    fn keep(&self, workdir: &WorkDir) -> Result<()> {
        if let Some(root) = &self.options.keep_workdir {
            let name = workdir
                .path()
                .file_name()
                .map(Path::new)
                .unwrap_or(Path::new("render"));
            workdir.persist_copy(&root.join(name))?;
            debug!(dest = %root.join(name).display(), "Kept work dir");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DitherMode, Palette};
    use crate::raster::RasterOptions;
    use crate::record::CoverSource;
    use chrono::NaiveDate;
    use image::Rgb;

    fn renderer(target: DisplayTarget, options: RenderOptions) -> CardRenderer {
        let session = Arc::new(RasterSession::new(RasterOptions {
            fonts_dir: None,
            load_system_fonts: false,
        }));
        CardRenderer::new(
            target,
            &TemplateSet::embedded(),
            options,
            session,
            AssetResolver::new().unwrap(),
        )
        .unwrap()
    }

    fn album() -> AlbumRecord {
        let cover = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([200, 40, 40])));
        AlbumRecord::new("Engigstciak", "Daniel Case", "2000", CoverSource::Decoded(cover))
            .with_primary_link("https://open.spotify.com/album/1")
            .with_secondary_link("https://www.discogs.com/master/1")
    }

    fn weather() -> WeatherRecord {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        WeatherRecord {
            temperature_range: (11.2, 19.8),
            current_temp: 15.4,
            wind_speed: 14.0,
            wind_scale_index: 3,
            precipitation_series: vec![0.0, 0.4, 1.2],
            sunrise: day.and_hms_opt(5, 48, 0).unwrap(),
            sunset: day.and_hms_opt(20, 27, 0).unwrap(),
            condition_label: "Partly cloudy".to_string(),
            condition_icon_url: None,
            location: "Berkeley, CA".to_string(),
            temperature_unit: "°C".to_string(),
            wind_unit: "km/h".to_string(),
        }
    }

    fn work_root() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_portrait_album_card() {
        let root = work_root();
        let options = RenderOptions {
            work_root: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        let card = renderer(DisplayTarget::portrait(), options)
            .render_album(&album())
            .await
            .unwrap();

        assert_eq!(card.dimensions(), (600, 900));
        // Cover fills the top square.
        let Rgb([r, g, b]) = *card.get_pixel(300, 300);
        assert!(r.abs_diff(200) <= 2 && g.abs_diff(40) <= 2 && b.abs_diff(40) <= 2);
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn test_widescreen_cover_is_quantized() {
        let card = renderer(DisplayTarget::widescreen(), RenderOptions::default())
            .render_album(&album())
            .await
            .unwrap();

        assert_eq!(card.dimensions(), (800, 480));
        let palette = Palette::seven_color();
        for (x, y) in [(0, 0), (100, 200), (240, 240), (479, 479)] {
            assert!(palette.contains(card.get_pixel(x, y)), "({x},{y})");
        }
    }

    #[tokio::test]
    async fn test_card_dither_mode_quantizes_everything() {
        let mut target = DisplayTarget::widescreen();
        target.dither = DitherMode::Card;
        let card = renderer(target, RenderOptions::default())
            .render_weather(&weather())
            .await
            .unwrap();

        let palette = Palette::seven_color();
        assert!(card.pixels().all(|p| palette.contains(p)));
    }

    #[tokio::test]
    async fn test_oversized_link_leaves_slot_empty() {
        let long = format!("https://example.com/{}", "x".repeat(4000));
        let album = album().with_primary_link(long);
        let card = renderer(DisplayTarget::portrait(), RenderOptions::default())
            .render_album(&album)
            .await
            .unwrap();
        assert_eq!(card.dimensions(), (600, 900));
    }

    #[tokio::test]
    async fn test_weather_card_sizes() {
        for (target, size) in [
            (DisplayTarget::portrait(), (600, 900)),
            (DisplayTarget::widescreen(), (800, 480)),
        ] {
            let card = renderer(target, RenderOptions::default())
                .render_weather(&weather())
                .await
                .unwrap();
            assert_eq!(card.dimensions(), size);
        }
    }

    #[tokio::test]
    async fn test_keep_workdir_copies_files() {
        let root = work_root();
        let keep = work_root();
        let options = RenderOptions {
            work_root: Some(root.path().to_path_buf()),
            keep_workdir: Some(keep.path().to_path_buf()),
            ..Default::default()
        };
        renderer(DisplayTarget::portrait(), options)
            .render_album(&album())
            .await
            .unwrap();

        assert_eq!(entries(root.path()), 0);
        let kept: Vec<_> = std::fs::read_dir(keep.path()).unwrap().collect();
        assert_eq!(kept.len(), 1);
        let dir = kept[0].as_ref().unwrap().path();
        assert!(dir.join(document::MARKUP_FILE).is_file());
        assert!(dir.join(document::STYLESHEET_FILE).is_file());
        // cover + two link codes
        let pngs = std::fs::read_dir(&dir)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .is_some_and(|x| x == "png")
            })
            .count();
        assert_eq!(pngs, 3);
    }

    #[tokio::test]
    async fn test_shutdown_releases_session() {
        let root = work_root();
        let options = RenderOptions {
            work_root: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        let renderer = renderer(DisplayTarget::portrait(), options);
        renderer.shutdown();

        let err = renderer.render_album(&album()).await.unwrap_err();
        assert!(matches!(err, FrameyError::RasterizationUnavailable(_)));
        assert_eq!(entries(root.path()), 0);
    }
}
