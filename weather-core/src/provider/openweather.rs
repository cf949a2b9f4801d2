use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::model::{City, WeatherSnapshot};

use super::WeatherProvider;

const CURRENT_WEATHER_PATH: &str = "data/2.5/weather";

/// Client for the OpenWeather current-weather endpoint.
///
/// Requests are keyed by coordinates and sent without a `units` parameter,
/// so temperatures come back in Kelvin.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    endpoint: Url,
    http: Client,
}

impl OpenWeatherProvider {
    /// `base_url` is scheme and host (plus an optional path prefix), e.g.
    /// `https://api.openweathermap.org`.
    pub fn with_base_url(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let raw = format!("{}/{CURRENT_WEATHER_PATH}", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&raw)
            .with_context(|| format!("Invalid weather endpoint base URL '{base_url}'"))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            endpoint,
            http,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn fetch_current(&self, city: &City) -> Result<WeatherSnapshot> {
        debug!(city = %city.name, lat = city.lat, lon = city.lon, "requesting current weather");

        let res = self
            .http
            .get(self.endpoint.clone())
            .query(&[
                ("lat", city.lat.to_string()),
                ("lon", city.lon.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to OpenWeather for {}", city.name)
            })?;

        let status = res.status();
        let body = res.text().await.with_context(|| {
            format!("Failed to read OpenWeather response body for {}", city.name)
        })?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather request for {} failed with status {}: {}",
                city.name,
                status,
                truncate_body(&body),
            ));
        }

        parse_current(&body)
            .with_context(|| format!("Failed to parse OpenWeather JSON for {}", city.name))
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
}

fn parse_current(body: &str) -> Result<WeatherSnapshot> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;

    let condition = parsed
        .weather
        .into_iter()
        .next()
        .map(|w| w.main)
        .ok_or_else(|| anyhow!("response contained an empty `weather` array"))?;

    let observed_at = DateTime::<Utc>::from_timestamp(parsed.dt, 0)
        .ok_or_else(|| anyhow!("timestamp {} is out of range", parsed.dt))?;

    Ok(WeatherSnapshot {
        condition,
        temp_k: parsed.main.temp,
        feels_like_k: parsed.main.feels_like,
        humidity: parsed.main.humidity,
        observed_at,
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, city: &City) -> Result<WeatherSnapshot> {
        self.fetch_current(city).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
