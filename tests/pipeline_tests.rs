//! # Pipeline Tests
//!
//! End-to-end album renders against a local HTTP server standing in for the
//! cover host.
//!
//! ## Test Coverage
//!
//! - Output geometry per display target
//! - Cover dithering on the e-paper target
//! - Fetch failures abort the render and leave no work dir behind
//! - Optional link slots, and links too long for a QR code

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use framey::FrameyError;
use framey::assets::AssetResolver;
use framey::display::{DisplayTarget, Palette};
use framey::document::TemplateSet;
use framey::pipeline::{CardRenderer, RenderOptions};
use framey::raster::{RasterOptions, RasterSession};
use framey::record::{AlbumRecord, CoverSource};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn cover_png() -> Vec<u8> {
    let cover = RgbImage::from_fn(300, 300, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 96]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(cover)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Serve `/cover.png`; everything else is a 404.
fn cover_host() -> SocketAddr {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let png = cover_png();
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let response = if request.url() == "/cover.png" {
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"image/png"[..]).unwrap();
                tiny_http::Response::from_data(png.clone()).with_header(header)
            } else {
                tiny_http::Response::from_data(b"not found".to_vec()).with_status_code(404)
            };
            let _ = request.respond(response);
        }
    });
    addr
}

fn renderer(target: DisplayTarget, work_root: &Path) -> CardRenderer {
    let session = Arc::new(RasterSession::new(RasterOptions {
        fonts_dir: None,
        load_system_fonts: false,
    }));
    CardRenderer::new(
        target,
        &TemplateSet::embedded(),
        RenderOptions {
            work_root: Some(work_root.to_path_buf()),
            ..Default::default()
        },
        session,
        AssetResolver::new().unwrap(),
    )
    .unwrap()
}

fn album(addr: SocketAddr, path: &str) -> AlbumRecord {
    AlbumRecord::new(
        "Engigstciak",
        "Daniel Case",
        "2000",
        CoverSource::remote(&format!("http://{}{}", addr, path)).unwrap(),
    )
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_portrait_card_with_both_links() {
    let addr = cover_host();
    let root = tempfile::tempdir().unwrap();
    let album = album(addr, "/cover.png")
        .with_primary_link("https://open.spotify.com/album/1")
        .with_secondary_link("https://www.discogs.com/master/1");

    let card = renderer(DisplayTarget::portrait(), root.path())
        .render_album(&album)
        .await
        .unwrap();

    assert_eq!(card.dimensions(), (600, 900));
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_widescreen_cover_pixels_in_palette() {
    let addr = cover_host();
    let root = tempfile::tempdir().unwrap();
    let album = album(addr, "/cover.png").with_primary_link("https://open.spotify.com/album/1");

    let card = renderer(DisplayTarget::widescreen(), root.path())
        .render_album(&album)
        .await
        .unwrap();

    assert_eq!(card.dimensions(), (800, 480));
    let palette = Palette::seven_color();
    for y in (0..480).step_by(37) {
        for x in (0..470).step_by(41) {
            assert!(palette.contains(card.get_pixel(x, y)), "({x},{y})");
        }
    }
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_missing_cover_is_fetch_failed() {
    let addr = cover_host();
    let root = tempfile::tempdir().unwrap();

    let err = renderer(DisplayTarget::portrait(), root.path())
        .render_album(&album(addr, "/missing.png"))
        .await
        .unwrap_err();

    match err {
        FrameyError::FetchFailed { url, reason } => {
            assert!(url.ends_with("/missing.png"));
            assert!(reason.contains("404"));
        }
        other => panic!("expected FetchFailed, got {other:?}"),
    }
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_unreachable_cover_host() {
    let root = tempfile::tempdir().unwrap();
    // Bind and drop to get a port nobody is listening on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let err = renderer(DisplayTarget::widescreen(), root.path())
        .render_album(&album(addr, "/cover.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, FrameyError::FetchFailed { .. }));
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_renders_without_links() {
    let addr = cover_host();
    let root = tempfile::tempdir().unwrap();

    for target in [DisplayTarget::portrait(), DisplayTarget::widescreen()] {
        let size = target.layout.canvas;
        let card = renderer(target, root.path())
            .render_album(&album(addr, "/cover.png").with_credits("Produced by Ken Scott"))
            .await
            .unwrap();
        assert_eq!(card.dimensions(), size);
    }
}

#[tokio::test]
async fn test_oversized_link_still_renders() {
    let addr = cover_host();
    let root = tempfile::tempdir().unwrap();
    let long = format!("https://open.spotify.com/album/{}", "x".repeat(5000));
    let album = album(addr, "/cover.png")
        .with_primary_link(long)
        .with_secondary_link("https://www.discogs.com/master/1");

    let card = renderer(DisplayTarget::portrait(), root.path())
        .render_album(&album)
        .await
        .unwrap();

    assert_eq!(card.dimensions(), (600, 900));
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_renders_are_deterministic() {
    let addr = cover_host();
    let root = tempfile::tempdir().unwrap();
    let renderer = renderer(DisplayTarget::widescreen(), root.path());
    let album = album(addr, "/cover.png").with_secondary_link("https://www.discogs.com/master/1");

    let first = renderer.render_album(&album).await.unwrap();
    let second = renderer.render_album(&album).await.unwrap();
    assert!(first == second);
}
