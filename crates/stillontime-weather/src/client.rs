//! Open-Meteo HTTP client: geocode the shoot location, fetch the daily
//! forecast, and turn it into a [`WeatherData`] record with warnings.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;

use stillontime_core::types::{ScheduleData, WeatherData};
use stillontime_core::{Result, StillOnTimeError};
use stillontime_core::config::WeatherConfig;

use crate::warnings::derive_warnings;

/// One day of forecast, normalized from the provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDay {
    pub temperature_c: f64,
    pub wind_speed_kmh: f64,
    pub precipitation_mm: f64,
    pub humidity_pct: f64,
    pub condition: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    latitude: f64,
    longitude: f64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    #[serde(default)]
    temperature_2m_max: Vec<f64>,
    #[serde(default)]
    wind_speed_10m_max: Vec<f64>,
    #[serde(default)]
    precipitation_sum: Vec<f64>,
    #[serde(default)]
    relative_humidity_2m_mean: Vec<f64>,
    #[serde(default)]
    weather_code: Vec<u32>,
}

/// Human-readable condition for a WMO weather code.
fn condition_for_code(code: u32) -> &'static str {
    match code {
        0 => "clear",
        1..=3 => "partly cloudy",
        45 | 48 => "fog",
        51..=57 => "drizzle",
        61..=67 => "rain",
        71..=77 => "snow",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95..=99 => "thunderstorm",
        _ => "overcast",
    }
}

/// Weather provider client.
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    geocode_url: String,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            geocode_url: config.geocode_url.trim_end_matches('/').to_string(),
        }
    }

    /// Point both endpoints elsewhere (tests, self-hosted mirrors).
    pub fn with_endpoints(mut self, base_url: &str, geocode_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.geocode_url = geocode_url.trim_end_matches('/').to_string();
        self
    }

    /// Resolve a free-text location to coordinates.
    pub async fn geocode(&self, location: &str) -> Result<(f64, f64)> {
        let url = format!("{}/v1/search", self.geocode_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("name", location), ("count", "1")])
            .send()
            .await
            .map_err(|e| StillOnTimeError::Weather(format!("Geocode request: {e}")))?;
        if !resp.status().is_success() {
            return Err(StillOnTimeError::Weather(format!(
                "Geocode HTTP {}",
                resp.status()
            )));
        }
        let body: GeocodeResponse = resp
            .json()
            .await
            .map_err(|e| StillOnTimeError::Weather(format!("Geocode response: {e}")))?;
        let hit = body.results.into_iter().next().ok_or_else(|| {
            StillOnTimeError::Weather(format!("No geocode match for '{location}'"))
        })?;
        tracing::debug!("📍 Geocoded '{}' -> {} ({}, {})", location, hit.name, hit.latitude, hit.longitude);
        Ok((hit.latitude, hit.longitude))
    }

    /// Fetch the forecast for one date at the given coordinates.
    pub async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
    ) -> Result<ForecastDay> {
        let url = format!("{}/v1/forecast", self.base_url);
        let date_str = date.format("%Y-%m-%d").to_string();
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("start_date", date_str.clone()),
                ("end_date", date_str),
                (
                    "daily",
                    "temperature_2m_max,wind_speed_10m_max,precipitation_sum,relative_humidity_2m_mean,weather_code"
                        .to_string(),
                ),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| StillOnTimeError::Weather(format!("Forecast request: {e}")))?;
        if !resp.status().is_success() {
            return Err(StillOnTimeError::Weather(format!(
                "Forecast HTTP {}",
                resp.status()
            )));
        }
        let body: ForecastResponse = resp
            .json()
            .await
            .map_err(|e| StillOnTimeError::Weather(format!("Forecast response: {e}")))?;
        parse_forecast_day(&body)
    }

    /// Fetch and normalize the forecast for one schedule.
    pub async fn fetch_for_schedule(&self, schedule: &ScheduleData) -> Result<WeatherData> {
        let (lat, lon) = self.geocode(&schedule.location).await?;
        let day = self.fetch_forecast(lat, lon, schedule.shooting_date).await?;
        let warnings = derive_warnings(&day);
        tracing::info!(
            "🌤️ Forecast for schedule {}: {} {:.0}°C ({} warnings)",
            schedule.id,
            day.condition,
            day.temperature_c,
            warnings.len()
        );
        Ok(WeatherData {
            schedule_id: schedule.id.clone(),
            forecast_date: schedule.shooting_date,
            temperature_c: day.temperature_c,
            wind_speed_kmh: day.wind_speed_kmh,
            precipitation_mm: day.precipitation_mm,
            humidity_pct: day.humidity_pct,
            condition: day.condition,
            warnings,
            fetched_at: Utc::now(),
        })
    }
}

fn parse_forecast_day(body: &ForecastResponse) -> Result<ForecastDay> {
    let d = &body.daily;
    let temp = d
        .temperature_2m_max
        .first()
        .copied()
        .ok_or_else(|| StillOnTimeError::Weather("Empty forecast".into()))?;
    let code = d.weather_code.first().copied().unwrap_or(u32::MAX);
    Ok(ForecastDay {
        temperature_c: temp,
        wind_speed_kmh: d.wind_speed_10m_max.first().copied().unwrap_or(0.0),
        precipitation_mm: d.precipitation_sum.first().copied().unwrap_or(0.0),
        humidity_pct: d.relative_humidity_2m_mean.first().copied().unwrap_or(0.0),
        condition: condition_for_code(code).to_string(),
    })
}
