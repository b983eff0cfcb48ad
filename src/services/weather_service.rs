use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;

use crate::config::WeatherConfig;
use crate::models::weather::{DailyForecast, GeoPoint, WeatherReport};

const MAX_FORECAST_DAYS: u32 = 16;
const DAILY_FIELDS: &str = "weathercode,temperature_2m_max,temperature_2m_min,precipitation_sum";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodedPlace>,
}

#[derive(Debug, Deserialize)]
struct GeocodedPlace {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    daily: DailyForecast,
}

#[derive(Debug)]
pub enum WeatherError {
    NotFound(String),
    HttpError(reqwest::Error),
    ResponseError(String),
}

impl fmt::Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherError::NotFound(place) => write!(f, "Destination not found: {}", place),
            WeatherError::HttpError(err) => write!(f, "HTTP error: {}", err),
            WeatherError::ResponseError(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl std::error::Error for WeatherError {}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::HttpError(err)
    }
}

pub struct WeatherService {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl WeatherService {
    pub fn new(config: &WeatherConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
        }
    }

    /// Daily forecast for a named place, up to 16 days ahead.
    pub async fn forecast(&self, destination: &str, days: u32) -> Result<WeatherReport, WeatherError> {
        let place = self.locate(destination).await?;
        debug!(
            "Geocoded '{}' to {} ({}, {})",
            destination, place.name, place.latitude, place.longitude
        );

        let response = self
            .client
            .get(format!("{}/v1/forecast", self.forecast_url))
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", days.clamp(1, MAX_FORECAST_DAYS).to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::ResponseError(format!(
                "Forecast request failed with status {}",
                status
            )));
        }
        let forecast: ForecastResponse = response.json().await?;

        Ok(WeatherReport {
            location: destination.to_string(),
            country: place.country,
            coordinates: GeoPoint {
                latitude: place.latitude,
                longitude: place.longitude,
            },
            forecast: forecast.daily,
        })
    }

    // "Jaipur, Rajasthan, India" often only geocodes as "Jaipur".
    async fn locate(&self, destination: &str) -> Result<GeocodedPlace, WeatherError> {
        if let Some(place) = self.geocode(destination).await? {
            return Ok(place);
        }

        let head = destination.split(',').next().unwrap_or_default().trim();
        if !head.is_empty() && head != destination.trim() {
            if let Some(place) = self.geocode(head).await? {
                return Ok(place);
            }
        }

        warn!("No geocoding match for '{}'", destination);
        Err(WeatherError::NotFound(destination.to_string()))
    }

    async fn geocode(&self, name: &str) -> Result<Option<GeocodedPlace>, WeatherError> {
        let response = self
            .client
            .get(format!("{}/v1/search", self.geocoding_url))
            .query(&[("name", name), ("count", "1"), ("language", "en"), ("format", "json")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::ResponseError(format!(
                "Geocoding request failed with status {}",
                status
            )));
        }

        let body: GeocodingResponse = response.json().await?;
        Ok(body.results.into_iter().next())
    }
}
