//! # framey CLI
//!
//! Command-line interface for rendering picture-frame cards.
//!
//! ## Usage
//!
//! ```bash
//! # Serve /playing.jpeg and /weather.jpeg
//! framey serve --config framey.json
//!
//! # Render one album card
//! framey album --title "Hunky Dory" --artist "David Bowie" --year 1971 \
//!     --cover https://example.com/cover.jpg \
//!     --primary-link https://open.spotify.com/album/6fQElzBNTiEMGdIeY0hy5l -o card.png
//!
//! # Render the weather card
//! framey weather --latitude 37.87 --longitude -122.27 --location "Berkeley, CA" -o weather.jpeg
//!
//! # Offline smoke test (generated cover, long text)
//! framey sample -o sample.png
//!
//! # Quantize any image to a display palette
//! framey dither photo.jpg -o photo-7c.png
//! ```

use clap::{Parser, Subcommand};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use framey::{
    FrameyError,
    assets::USER_AGENT,
    cache,
    config::{FrameyConfig, RenderSection, WeatherSection},
    display::DisplayTarget,
    pipeline::CardRenderer,
    record::{AlbumRecord, CoverSource},
    render::dither,
    server,
    sources::{OpenMeteoSource, WeatherSource, album::load_cover_file},
};

/// framey - album and weather cards for picture frames
#[derive(Parser, Debug)]
#[command(name = "framey")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// JSON config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Address to listen on (overrides the config file)
        #[arg(long)]
        listen: Option<String>,

        /// Display target (overrides the config file)
        #[arg(long)]
        target: Option<String>,
    },

    /// Render an album card to a file
    Album {
        #[arg(long)]
        title: String,

        #[arg(long)]
        artist: String,

        #[arg(long)]
        year: String,

        /// Cover image URL or local path
        #[arg(long, value_name = "URL|PATH")]
        cover: String,

        /// Streaming link (QR code with the streaming badge)
        #[arg(long, value_name = "URL")]
        primary_link: Option<String>,

        /// Catalog link (QR code with the record badge)
        #[arg(long, value_name = "URL")]
        secondary_link: Option<String>,

        #[arg(long)]
        credits: Option<String>,

        #[arg(long, default_value = "widescreen")]
        target: String,

        /// Output file (.png or .jpeg)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Keep a copy of the work dir for inspection
        #[arg(long, value_name = "DIR")]
        keep_workdir: Option<PathBuf>,
    },

    /// Render the weather card for a location
    Weather {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,

        #[arg(long)]
        location: String,

        #[arg(long, default_value = "celsius")]
        temperature_unit: String,

        #[arg(long, default_value = "kmh")]
        windspeed_unit: String,

        #[arg(long, default_value = "widescreen")]
        target: String,

        /// Output file (.png or .jpeg)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Render a sample album card without network access
    Sample {
        #[arg(long, default_value = "widescreen")]
        target: String,

        /// Output file (.png or .jpeg)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Quantize an image to a display palette
    Dither {
        input: PathBuf,

        /// Output file (.png or .jpeg)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[arg(long, default_value = "widescreen")]
        target: String,

        /// Bayer matrix order (power of two)
        #[arg(long)]
        order: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("framey=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), FrameyError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            listen,
            target,
        } => {
            let mut config = FrameyConfig::load_or_default(config.as_deref())?;
            if let Some(listen) = listen {
                config.server.listen_addr = listen;
            }
            if let Some(target) = target {
                config.render.target = target;
            }
            server::serve(config).await?;
        }

        Commands::Album {
            title,
            artist,
            year,
            cover,
            primary_link,
            secondary_link,
            credits,
            target,
            output,
            keep_workdir,
        } => {
            let cover = if cover.starts_with("http://") || cover.starts_with("https://") {
                CoverSource::remote(&cover)?
            } else {
                load_cover_file(PathBuf::from(cover)).await?
            };
            let mut album = AlbumRecord::new(title, artist, year, cover);
            album.primary_link_url = primary_link;
            album.secondary_link_url = secondary_link;
            album.credits = credits;

            let section = RenderSection {
                target,
                keep_workdir,
                ..RenderSection::default()
            };
            let card = renderer(&section)?.render_album(&album).await?;
            save_card(&output, &card)?;
            println!("Saved to {}", output.display());
        }

        Commands::Weather {
            latitude,
            longitude,
            location,
            temperature_unit,
            windspeed_unit,
            target,
            output,
        } => {
            let source = OpenMeteoSource::from_config(&WeatherSection {
                latitude,
                longitude,
                location,
                temperature_unit,
                windspeed_unit,
                endpoint: None,
            })?;
            let weather = source.current().await?;
            println!(
                "{}: {} {}{}",
                weather.location,
                weather.condition_label,
                weather.current_temp.round(),
                weather.temperature_unit
            );

            let section = RenderSection {
                target,
                ..RenderSection::default()
            };
            let card = renderer(&section)?.render_weather(&weather).await?;
            save_card(&output, &card)?;
            println!("Saved to {}", output.display());
        }

        Commands::Sample { target, output } => {
            let album = AlbumRecord::new(
                "An Unreasonably Long Album Title That Has To Wrap Across Several Lines",
                "The Placeholder Ensemble featuring Somebody Else",
                "1999",
                CoverSource::Decoded(DynamicImage::ImageRgb8(sample_cover(600))),
            )
            .with_primary_link("https://open.spotify.com/album/6fQElzBNTiEMGdIeY0hy5l")
            .with_secondary_link("https://www.discogs.com/master/1")
            .with_credits("Recorded live somewhere, mixed somewhere else");

            let section = RenderSection {
                target,
                ..RenderSection::default()
            };
            let card = renderer(&section)?.render_album(&album).await?;
            save_card(&output, &card)?;
            println!("Saved to {}", output.display());
        }

        Commands::Dither {
            input,
            output,
            target,
            order,
        } => {
            let display = display_target(&target)?;
            let palette = display.palette.as_ref().ok_or_else(|| {
                FrameyError::Config(format!("display target '{}' has no palette", target))
            })?;
            let order = order.unwrap_or(display.matrix_order);

            let image = image::ImageReader::open(&input)?
                .with_guessed_format()?
                .decode()?;
            println!(
                "Quantizing {} ({}x{}) to {} colors...",
                input.display(),
                image.width(),
                image.height(),
                palette.len()
            );
            let quantized =
                dither::quantize_with(&image, palette, order, [display.channel_divisor; 3])?;
            save_card(&output, &quantized)?;
            println!("Saved to {}", output.display());
        }
    }

    Ok(())
}

fn display_target(name: &str) -> Result<DisplayTarget, FrameyError> {
    DisplayTarget::by_name(name).ok_or_else(|| {
        FrameyError::Config(format!(
            "Unknown display target '{}'. Available: {}",
            name,
            DisplayTarget::list().join(", ")
        ))
    })
}

fn renderer(section: &RenderSection) -> Result<CardRenderer, FrameyError> {
    display_target(&section.target)?;
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FrameyError::Config(format!("HTTP client error: {}", e)))?;
    CardRenderer::from_config(section, client)
}

/// Save a card as PNG or JPEG depending on the file extension.
fn save_card(path: &Path, card: &RgbImage) -> Result<(), FrameyError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => {
            std::fs::write(path, cache::encode_jpeg(card)?)?;
        }
        Some("png") => {
            card.save_with_format(path, ImageFormat::Png)?;
        }
        _ => {
            return Err(FrameyError::Config(format!(
                "Unsupported output '{}' (use .png or .jpeg)",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Diagonal color sweep with a few bands, so dithering has something to do.
fn sample_cover(size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let t = (x + y) as f32 / (2 * size) as f32;
        let band = ((y / (size / 6).max(1)) % 2) as f32 * 40.0;
        Rgb([
            (255.0 * (1.0 - t)) as u8,
            (90.0 + band + 100.0 * t) as u8,
            (255.0 * t) as u8,
        ])
    })
}
