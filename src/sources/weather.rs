//! # Open-Meteo Weather
//!
//! Queries the free Open-Meteo forecast API and normalizes the answer into a
//! [`WeatherRecord`].
//!
//! ## Wind scale
//!
//! Wind is reported in the configured unit but graded in km/h:
//!
//! | Unit  | To km/h |
//! |-------|---------|
//! | `kmh` | ×1      |
//! | `mph` | ×1.61   |
//! | `ms`  | ×3.6    |
//! | `kn`  | ×1.852  |
//!
//! Unknown units fall back to `kmh`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use super::WeatherSource;
use crate::assets::USER_AGENT;
use crate::config::WeatherSection;
use crate::error::{FrameyError, Result};
use crate::record::WeatherRecord;

/// Public forecast endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";

/// Upper bounds (km/h, exclusive of the next grade) of Beaufort 0..=11.
const BEAUFORT_KMH: [f64; 12] = [1.0, 6.0, 12.0, 20.0, 29.0, 39.0, 50.0, 62.0, 75.0, 89.0, 103.0, 118.0];

/// Beaufort number for a wind speed in km/h.
pub fn beaufort(kmh: f64) -> u8 {
    BEAUFORT_KMH.iter().take_while(|&&limit| kmh > limit).count() as u8
}

/// Wind speed unit accepted by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindUnit {
    Kmh,
    Mph,
    Ms,
    Kn,
}

impl WindUnit {
    pub fn parse(s: &str) -> Self {
        match s {
            "mph" => WindUnit::Mph,
            "ms" => WindUnit::Ms,
            "kn" => WindUnit::Kn,
            "kmh" => WindUnit::Kmh,
            other => {
                warn!(unit = other, "Unknown wind unit, using kmh");
                WindUnit::Kmh
            }
        }
    }

    pub fn as_query(&self) -> &'static str {
        match self {
            WindUnit::Kmh => "kmh",
            WindUnit::Mph => "mph",
            WindUnit::Ms => "ms",
            WindUnit::Kn => "kn",
        }
    }

    pub fn to_kmh(&self) -> f64 {
        match self {
            WindUnit::Kmh => 1.0,
            WindUnit::Mph => 1.61,
            WindUnit::Ms => 3.6,
            WindUnit::Kn => 1.852,
        }
    }
}

/// Human label and icon for a WMO weather code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub label: &'static str,
    pub icon_url: String,
}

/// `(code, day label, night label, icon)`
const WMO_CODES: &[(u16, &str, &str, &str)] = &[
    (0, "Sunny", "Clear", "01"),
    (1, "Mainly Sunny", "Mainly Clear", "01"),
    (2, "Partly Cloudy", "Partly Cloudy", "02"),
    (3, "Cloudy", "Cloudy", "03"),
    (45, "Foggy", "Foggy", "50"),
    (48, "Rime Fog", "Rime Fog", "50"),
    (51, "Light Drizzle", "Light Drizzle", "09"),
    (53, "Drizzle", "Drizzle", "09"),
    (55, "Heavy Drizzle", "Heavy Drizzle", "09"),
    (56, "Light Freezing Drizzle", "Light Freezing Drizzle", "09"),
    (57, "Freezing Drizzle", "Freezing Drizzle", "09"),
    (61, "Light Rain", "Light Rain", "10"),
    (63, "Rain", "Rain", "10"),
    (65, "Heavy Rain", "Heavy Rain", "10"),
    (66, "Freezing Rain", "Freezing Rain", "10"),
    (67, "Freezing Rain", "Freezing Rain", "10"),
    (71, "Light Snow", "Light Snow", "13"),
    (73, "Snow", "Snow", "13"),
    (75, "Heavy Snow", "Heavy Snow", "13"),
    (77, "Snow Grains", "Snow Grains", "13"),
    (80, "Light Showers", "Light Showers", "09"),
    (81, "Showers", "Showers", "09"),
    (82, "Heavy Showers", "Heavy Showers", "09"),
    (85, "Snow Showers", "Snow Showers", "13"),
    (86, "Snow Showers", "Snow Showers", "13"),
    (95, "Thunderstorm", "Thunderstorm", "11"),
    (96, "Thunderstorm With Hail", "Thunderstorm With Hail", "11"),
    (99, "Thunderstorm With Hail", "Thunderstorm With Hail", "11"),
];

/// Look up a WMO code. `None` for codes outside the table.
pub fn condition(code: u16, is_day: bool) -> Option<Condition> {
    WMO_CODES
        .iter()
        .find(|(c, ..)| *c == code)
        .map(|&(_, day, night, icon)| Condition {
            label: if is_day { day } else { night },
            icon_url: format!(
                "http://openweathermap.org/img/wn/{}{}@2x.png",
                icon,
                if is_day { 'd' } else { 'n' }
            ),
        })
}

#[derive(Debug, Deserialize)]
struct Forecast {
    daily_units: DailyUnits,
    daily: Daily,
    hourly: Hourly,
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct DailyUnits {
    temperature_2m_max: String,
    windspeed_10m_max: String,
}

#[derive(Debug, Deserialize)]
struct Daily {
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    sunrise: Vec<String>,
    sunset: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Hourly {
    precipitation: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: u16,
    is_day: u8,
}

/// Weather from the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    client: reqwest::Client,
    endpoint: Url,
    latitude: f64,
    longitude: f64,
    location: String,
    temperature_unit: String,
    wind_unit: WindUnit,
}

impl OpenMeteoSource {
    pub fn new(client: reqwest::Client, section: &WeatherSection) -> Result<Self> {
        let endpoint = section.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let endpoint = Url::parse(endpoint)
            .map_err(|e| FrameyError::Config(format!("invalid weather endpoint '{}': {}", endpoint, e)))?;
        Ok(Self {
            client,
            endpoint,
            latitude: section.latitude,
            longitude: section.longitude,
            location: section.location.clone(),
            temperature_unit: section.temperature_unit.clone(),
            wind_unit: WindUnit::parse(&section.windspeed_unit),
        })
    }

    /// Build with a default client.
    pub fn from_config(section: &WeatherSection) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FrameyError::Config(format!("HTTP client error: {}", e)))?;
        Self::new(client, section)
    }

    /// The full request URL.
    pub fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &self.latitude.to_string())
            .append_pair("longitude", &self.longitude.to_string())
            .append_pair("hourly", "precipitation")
            .append_pair(
                "daily",
                "temperature_2m_max,temperature_2m_min,sunrise,sunset,windspeed_10m_max",
            )
            .append_pair("current_weather", "true")
            .append_pair("timezone", "auto")
            .append_pair("temperature_unit", &self.temperature_unit)
            .append_pair("windspeed_unit", self.wind_unit.as_query());
        url
    }

    /// Normalize a forecast response body.
    pub fn parse(&self, body: &str) -> Result<WeatherRecord> {
        let forecast: Forecast = serde_json::from_str(body)
            .map_err(|e| FrameyError::Source(format!("unexpected forecast response: {}", e)))?;

        let min = first_value(&forecast.daily.temperature_2m_min, "minimum temperature")?;
        let max = first_value(&forecast.daily.temperature_2m_max, "maximum temperature")?;
        let sunrise = first_time(&forecast.daily.sunrise, "sunrise")?;
        let sunset = first_time(&forecast.daily.sunset, "sunset")?;

        let current = &forecast.current_weather;
        let is_day = current.is_day == 1;
        let (label, icon_url) = match condition(current.weathercode, is_day) {
            Some(c) => (c.label.to_string(), Url::parse(&c.icon_url).ok()),
            None => {
                warn!(code = current.weathercode, "Unknown weather code");
                ("Unknown".to_string(), None)
            }
        };

        Ok(WeatherRecord {
            temperature_range: (min, max),
            current_temp: current.temperature,
            wind_speed: current.windspeed,
            wind_scale_index: beaufort(current.windspeed * self.wind_unit.to_kmh()),
            precipitation_series: forecast
                .hourly
                .precipitation
                .iter()
                .map(|p| p.unwrap_or(0.0))
                .collect(),
            sunrise,
            sunset,
            condition_label: label,
            condition_icon_url: icon_url,
            location: self.location.clone(),
            temperature_unit: forecast.daily_units.temperature_2m_max,
            wind_unit: forecast.daily_units.windspeed_10m_max,
        })
    }
}

fn first_value(series: &[Option<f64>], name: &str) -> Result<f64> {
    series
        .first()
        .copied()
        .flatten()
        .ok_or_else(|| FrameyError::Source(format!("forecast has no {}", name)))
}

fn first_time(series: &[String], name: &str) -> Result<NaiveDateTime> {
    let raw = series
        .first()
        .ok_or_else(|| FrameyError::Source(format!("forecast has no {}", name)))?;
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .map_err(|e| FrameyError::Source(format!("bad {} time '{}': {}", name, raw, e)))
}

#[async_trait]
impl WeatherSource for OpenMeteoSource {
    async fn current(&self) -> Result<WeatherRecord> {
        let url = self.request_url();
        let source_error = |e: reqwest::Error| FrameyError::Source(format!("forecast request failed: {}", e));

        let response = self.client.get(url.clone()).send().await.map_err(source_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FrameyError::Source(format!("forecast request failed: HTTP {}", status)));
        }
        let body = response.text().await.map_err(source_error)?;
        debug!(%url, bytes = body.len(), "Fetched forecast");
        self.parse(&body)
    }
}
