//! Open-Meteo weather passthrough
//!
//! Backs `GET /api/weather?lat=..&lon=..`. Fetches current conditions plus
//! seven days of history so a client can pre-fill a prediction request
//! (rainfall, temperature, humidity) from its location.
//!
//! API Documentation: https://open-meteo.com/en/docs

use crate::config::WeatherSettings;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

pub const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,precipitation";
const DAILY_FIELDS: &str = "precipitation_sum,temperature_2m_max,relative_humidity_2m_mean";
const PAST_DAYS: u32 = 7;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Latitude and longitude are required query parameters.")]
    MissingCoordinates,

    #[error("Latitude and longitude must be numeric coordinates within range.")]
    InvalidCoordinates,

    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather API error: {0}")]
    Status(u16),

    #[error("weather response has no current conditions")]
    MissingCurrent,
}

impl WeatherError {
    /// Client mistakes are 400; upstream trouble is 500.
    pub fn status_code(&self) -> u16 {
        match self {
            WeatherError::MissingCoordinates | WeatherError::InvalidCoordinates => 400,
            _ => 500,
        }
    }
}

// ---------------------------------------------------------------------------
// Query handling
// ---------------------------------------------------------------------------

/// Extracts `lat` and `lon` from a raw query string (no leading `?`).
pub fn parse_coordinates(query: &str) -> Result<(f64, f64), WeatherError> {
    let mut lat = None;
    let mut lon = None;

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let slot = match key {
            "lat" => &mut lat,
            "lon" => &mut lon,
            _ => continue,
        };
        let value = urlencoding::decode(value)
            .map_err(|_| WeatherError::InvalidCoordinates)?
            .into_owned();
        *slot = Some(value);
    }

    let (lat, lon) = match (lat, lon) {
        (Some(lat), Some(lon)) if !lat.trim().is_empty() && !lon.trim().is_empty() => (lat, lon),
        _ => return Err(WeatherError::MissingCoordinates),
    };

    let lat: f64 = lat.trim().parse().map_err(|_| WeatherError::InvalidCoordinates)?;
    let lon: f64 = lon.trim().parse().map_err(|_| WeatherError::InvalidCoordinates)?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(WeatherError::InvalidCoordinates);
    }

    Ok((lat, lon))
}

/// Forecast URL for current conditions plus the past week.
pub fn build_forecast_url(base_url: &str, lat: f64, lon: f64) -> String {
    format!(
        "{}/v1/forecast?latitude={}&longitude={}&current={}&daily={}&timezone=auto&past_days={}",
        base_url.trim_end_matches('/'),
        lat,
        lon,
        CURRENT_FIELDS,
        DAILY_FIELDS,
        PAST_DAYS
    )
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

pub struct WeatherClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(settings: &WeatherSettings) -> Result<Self, WeatherError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
        })
    }

    /// Fetches the raw forecast document for a location.
    pub fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<Value, WeatherError> {
        let url = build_forecast_url(&self.base_url, lat, lon);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status().as_u16()));
        }

        Ok(response.json()?)
    }
}

// ---------------------------------------------------------------------------
// Autofill
// ---------------------------------------------------------------------------

/// The `current` block of a forecast document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentConditions {
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    /// Millimetres over the preceding interval.
    pub precipitation: Option<f64>,
}

impl CurrentConditions {
    pub fn from_forecast(forecast: &Value) -> Result<Self, WeatherError> {
        let current = forecast.get("current").ok_or(WeatherError::MissingCurrent)?;
        serde_json::from_value(current.clone()).map_err(|_| WeatherError::MissingCurrent)
    }

    /// Partial `/predict` body. Fields the API did not report are left out
    /// so the schema's defaults (or required-field errors) apply.
    pub fn to_request_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        let pairs = [
            ("rainfall", self.precipitation),
            ("temperature", self.temperature_2m),
            ("humidity", self.relative_humidity_2m),
        ];
        for (name, value) in pairs {
            if let Some(v) = value {
                fields.insert(name.to_string(), Value::from(v));
            }
        }
        fields
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
