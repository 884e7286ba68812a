//! # Asset Resolution
//!
//! Turns a [`CoverSource`] into a file staged inside the render's
//! [`WorkDir`], where the markup and the card composer can reach it.
//!
//! - `Remote` covers are downloaded with a single GET. Any transport error
//!   or non-success status is a `FetchFailed` and aborts the render.
//! - `Decoded` covers are written out as PNG without touching the network.
//!
//! For dither-aware displays the staged cover is resized to its final square
//! and quantized to the device palette before the reference is handed back.

pub mod workdir;

pub use workdir::{StagedAsset, WorkDir};

use image::{DynamicImage, ImageFormat, imageops::FilterType};
use reqwest::{Url, header::CONTENT_TYPE};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::display::Palette;
use crate::error::{FrameyError, Result};
use crate::record::CoverSource;
use crate::render::dither;

/// User agent sent with every asset request.
pub const USER_AGENT: &str = "framey/0.1";

/// Quantization applied to a staged cover.
#[derive(Debug, Clone)]
pub struct CoverDither {
    pub palette: Palette,
    pub order: usize,
    pub divisor: f32,
    /// Final cover size on the card; quantizing at this size keeps the pasted
    /// cover inside the palette.
    pub size: (u32, u32),
}

/// Fetches and stages cover art and icons.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    client: reqwest::Client,
}

impl AssetResolver {
    /// Create a resolver with its own HTTP client.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FrameyError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self { client })
    }

    /// Create a resolver that shares an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Stage a cover, optionally quantizing it.
    pub async fn resolve(
        &self,
        cover: &CoverSource,
        workdir: &WorkDir,
        dither: Option<&CoverDither>,
    ) -> Result<StagedAsset> {
        let staged = match cover {
            CoverSource::Remote(url) => self.fetch(url, workdir, "cover").await?,
            CoverSource::Decoded(image) => {
                let asset = StagedAsset::new(workdir, workdir.unique_name("cover", "png"));
                let image = image.clone();
                let path = asset.path.clone();
                run_blocking(move || {
                    image.save_with_format(&path, ImageFormat::Png)?;
                    Ok(())
                })
                .await?;
                debug!(file = %asset.file_name, "Staged in-memory cover");
                asset
            }
        };

        match dither {
            Some(plan) => {
                let plan = plan.clone();
                run_blocking(move || quantize_staged(staged, &plan)).await
            }
            None => Ok(staged),
        }
    }

    /// Download `url` into the work dir, streaming the body to disk.
    pub async fn fetch(&self, url: &Url, workdir: &WorkDir, prefix: &str) -> Result<StagedAsset> {
        let fetch_failed = |reason: String| FrameyError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_failed(format!("HTTP {}", status)));
        }

        let extension = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(extension_for_content_type)
            .unwrap_or("img");
        let asset = StagedAsset::new(workdir, workdir.unique_name(prefix, extension));

        let mut file = tokio::fs::File::create(&asset.path).await?;
        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        info!(%url, bytes = written, file = %asset.file_name, "Fetched asset");
        Ok(asset)
    }
}

/// Resize + quantize a staged file, rewriting it as PNG.
fn quantize_staged(asset: StagedAsset, plan: &CoverDither) -> Result<StagedAsset> {
    let source = asset.load()?;
    let (w, h) = plan.size;
    let resized = if (source.width(), source.height()) == (w, h) {
        source
    } else {
        source.resize_exact(w, h, FilterType::Lanczos3)
    };
    let quantized = dither::quantize_with(&resized, &plan.palette, plan.order, [plan.divisor; 3])?;

    let png_name = match asset.path.extension().and_then(|e| e.to_str()) {
        Some("png") => asset.file_name.clone(),
        _ => {
            let stem = asset
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("cover");
            format!("{stem}.png")
        }
    };
    let target = asset.path.with_file_name(&png_name);
    DynamicImage::ImageRgb8(quantized).save_with_format(&target, ImageFormat::Png)?;
    if target != asset.path {
        std::fs::remove_file(&asset.path)?;
    }
    debug!(file = %png_name, "Quantized staged cover");
    Ok(StagedAsset {
        file_name: png_name,
        path: target,
    })
}

fn extension_for_content_type(content_type: &str) -> &'static str {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "image/jpeg" | "image/jpg" => "jpeg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "img",
    }
}

/// Run CPU-bound work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FrameyError::Task(e.to_string()))?
}
