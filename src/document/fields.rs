//! Field sets for the album and weather templates.
//!
//! Album: `year`, `title`, `artist`, `cover`, `spotify_qrcode`,
//! `discogs_qrcode`, `credits`, plus `title_lines`, `artist_lines` and
//! `credits_lines` (lists of `{line, first}` items; SVG text does not wrap).
//!
//! Weather: `temp`, `range`, `wind`, `description`, `icon`, `sunrise`,
//! `sunset`, `precipitation` (list of `{x, y, height, value}` bars),
//! `location`, `TEMPUNIT`, `WINDUNIT`, `baufort`.
//!
//! Optional inputs are inserted only when present, so templates guard them
//! with `{{#key}}` blocks.

use crate::record::{AlbumRecord, WeatherRecord};

use super::template::Fields;

/// Hours of precipitation shown in the chart (today, from midnight).
pub const PRECIPITATION_HOURS: usize = 24;

/// Precipitation chart area in template units.
pub const CHART_WIDTH: f64 = 480.0;
pub const CHART_HEIGHT: f64 = 80.0;

/// Bars never scale below this many mm, so drizzle stays small.
const CHART_MIN_SCALE: f64 = 1.0;

/// Files staged for an album card, by name relative to the work dir.
#[derive(Debug, Clone, Default)]
pub struct AlbumAssets {
    pub cover: String,
    pub primary_qr: Option<String>,
    pub secondary_qr: Option<String>,
}

/// Build the album field set.
pub fn album_fields(album: &AlbumRecord, assets: &AlbumAssets, wrap_columns: usize) -> Fields {
    let mut fields = Fields::new();
    fields
        .insert("year", album.year.as_str())
        .insert("title", album.title.as_str())
        .insert("artist", album.artist.as_str())
        .insert("cover", assets.cover.as_str())
        .insert("title_lines", line_items(&album.title, wrap_columns))
        .insert("artist_lines", line_items(&album.artist, wrap_columns))
        .insert_opt("spotify_qrcode", assets.primary_qr.clone())
        .insert_opt("discogs_qrcode", assets.secondary_qr.clone())
        .insert_opt("credits", album.credits.clone())
        .insert_opt(
            "credits_lines",
            album
                .credits
                .as_deref()
                .map(|credits| line_items(credits, wrap_columns)),
        );
    fields
}

/// Build the weather field set. `icon` is the staged icon file, if any.
pub fn weather_fields(weather: &WeatherRecord, icon: Option<&str>) -> Fields {
    let unit = weather.temperature_unit.as_str();
    let (min, max) = weather.temperature_range;

    let mut fields = Fields::new();
    fields
        .insert("temp", format!("{}{}", rounded(weather.current_temp), unit))
        .insert("range", format!("{}—{}{}", rounded(min), rounded(max), unit))
        .insert(
            "wind",
            format!("{}{}", rounded(weather.wind_speed), weather.wind_unit),
        )
        .insert("description", weather.condition_label.as_str())
        .insert_opt("icon", icon)
        .insert("sunrise", weather.sunrise.format("%H:%M").to_string())
        .insert("sunset", weather.sunset.format("%H:%M").to_string())
        .insert("precipitation", precipitation_bars(&weather.precipitation_series))
        .insert("location", weather.location.as_str())
        .insert("TEMPUNIT", unit)
        .insert("WINDUNIT", weather.wind_unit.as_str())
        .insert("baufort", weather.wind_scale_index.to_string());
    fields
}

/// Greedy word wrap to at most `columns` characters per line.
///
/// Words longer than a line are split. `columns == 0` disables wrapping.
pub fn wrap_lines(text: &str, columns: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if columns == 0 {
        return vec![text.split_whitespace().collect::<Vec<_>>().join(" ")];
    }

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();

        // Split words that can't fit on any line
        while chars.len() > columns {
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            let rest = chars.split_off(columns);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }

        let word_len = chars.len();
        if word_len == 0 {
            continue;
        }
        if line_len > 0 && line_len + 1 + word_len > columns {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.extend(chars);
        line_len += word_len;
    }
    if line_len > 0 {
        lines.push(line);
    }
    lines
}

fn line_items(text: &str, columns: usize) -> Vec<Fields> {
    wrap_lines(text, columns)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let mut item = Fields::new();
            item.insert("line", line).insert("first", i == 0);
            item
        })
        .collect()
}

fn precipitation_bars(series: &[f64]) -> Vec<Fields> {
    let hours = &series[..series.len().min(PRECIPITATION_HOURS)];
    let peak = hours.iter().copied().fold(CHART_MIN_SCALE, f64::max);
    let pitch = CHART_WIDTH / PRECIPITATION_HOURS as f64;

    hours
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
            let height = value / peak * CHART_HEIGHT;
            let mut bar = Fields::new();
            bar.insert("x", format!("{:.1}", i as f64 * pitch))
                .insert("y", format!("{:.1}", CHART_HEIGHT - height))
                .insert("height", format!("{:.1}", height))
                .insert("value", format!("{:.1}", value));
            bar
        })
        .collect()
}

/// Round half away from zero, without ever printing "-0".
fn rounded(value: f64) -> String {
    let r = value.round();
    if r == 0.0 {
        "0".to_string()
    } else {
        format!("{:.0}", r)
    }
}
