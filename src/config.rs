//! # Configuration
//!
//! Loaded from an optional JSON file; every section and field has a default,
//! so `{}` is a valid config.
//!
//! ```json
//! {
//!   "server": { "listen_addr": "0.0.0.0:8080", "cache_ttl_secs": 30 },
//!   "render": { "target": "widescreen", "keep_workdir": "/tmp/framey-debug" },
//!   "album": { "path": "/var/lib/framey/now-playing.json" },
//!   "weather": {
//!     "latitude": 37.87159,
//!     "longitude": -122.27275,
//!     "location": "Berkeley, CA",
//!     "temperature_unit": "fahrenheit"
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::display::DisplayTarget;
use crate::error::{FrameyError, Result};
use crate::raster::RasterOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameyConfig {
    pub server: ServerSection,
    pub render: RenderSection,
    /// Album source; the album route is disabled without it
    pub album: Option<AlbumSection>,
    /// Weather source; the weather route is disabled without it
    pub weather: Option<WeatherSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub listen_addr: String,
    /// How long a rendered card may answer `If-None-Match` without a re-render
    pub cache_ttl_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            cache_ttl_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    /// Display target preset name
    pub target: String,
    /// Where per-render work dirs are created (system temp dir if unset)
    pub work_root: Option<PathBuf>,
    /// Copy every work dir here before it is removed
    pub keep_workdir: Option<PathBuf>,
    pub raster_timeout_secs: u64,
    pub fonts_dir: Option<PathBuf>,
    pub load_system_fonts: bool,
    /// Template/stylesheet overrides
    pub templates_dir: Option<PathBuf>,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            target: DisplayTarget::default().name.to_string(),
            work_root: None,
            keep_workdir: None,
            raster_timeout_secs: 30,
            fonts_dir: None,
            load_system_fonts: true,
            templates_dir: None,
        }
    }
}

impl RenderSection {
    pub fn display_target(&self) -> Result<DisplayTarget> {
        DisplayTarget::by_name(&self.target).ok_or_else(|| {
            FrameyError::Config(format!(
                "unknown display target '{}' (expected one of: {})",
                self.target,
                DisplayTarget::list().join(", ")
            ))
        })
    }

    pub fn raster_timeout(&self) -> Duration {
        Duration::from_secs(self.raster_timeout_secs)
    }

    pub fn raster_options(&self) -> RasterOptions {
        RasterOptions {
            fonts_dir: self.fonts_dir.clone(),
            load_system_fonts: self.load_system_fonts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumSection {
    /// JSON file holding the album currently playing
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSection {
    pub latitude: f64,
    pub longitude: f64,
    pub location: String,
    #[serde(default = "default_temperature_unit")]
    pub temperature_unit: String,
    #[serde(default = "default_windspeed_unit")]
    pub windspeed_unit: String,
    /// Forecast API base URL
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_temperature_unit() -> String {
    "celsius".to_string()
}

fn default_windspeed_unit() -> String {
    "kmh".to_string()
}

impl FrameyConfig {
    /// Load from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FrameyError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| FrameyError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.server.cache_ttl_secs)
    }

    fn validate(&self) -> Result<()> {
        self.render.display_target()?;
        if self.render.raster_timeout_secs == 0 {
            return Err(FrameyError::Config(
                "render.raster_timeout_secs must be positive".to_string(),
            ));
        }
        if let Some(weather) = &self.weather {
            if !(-90.0..=90.0).contains(&weather.latitude)
                || !(-180.0..=180.0).contains(&weather.longitude)
            {
                return Err(FrameyError::Config(format!(
                    "weather coordinates out of range: {}, {}",
                    weather.latitude, weather.longitude
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(FrameyConfig::from_json("{}").unwrap(), FrameyConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = FrameyConfig::from_json(
            r#"{
                "server": { "cache_ttl_secs": 5 },
                "render": { "target": "portrait" },
                "weather": { "latitude": 37.87, "longitude": -122.27, "location": "Berkeley, CA" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.render.display_target().unwrap().name, "portrait");
        assert!(config.render.load_system_fonts);
        let weather = config.weather.unwrap();
        assert_eq!(weather.temperature_unit, "celsius");
        assert_eq!(weather.windspeed_unit, "kmh");
        assert!(config.album.is_none());
    }

    #[test]
    fn test_rejects_unknown_target() {
        let err = FrameyConfig::from_json(r#"{"render": {"target": "kindle"}}"#).unwrap_err();
        assert!(matches!(err, FrameyError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        let err = FrameyConfig::from_json(
            r#"{"weather": {"latitude": 137.0, "longitude": 0.0, "location": "x"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FrameyError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framey.json");
        std::fs::write(&path, r#"{"album": {"path": "/tmp/album.json"}}"#).unwrap();

        let config = FrameyConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.album.unwrap().path, PathBuf::from("/tmp/album.json"));
        assert!(FrameyConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
