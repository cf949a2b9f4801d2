use crate::{City, Config, WeatherSnapshot, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Source of current conditions for a single city.
///
/// One call is one network request. Implementations do not retry or cache;
/// an error means the city has no reading for the current cycle.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, city: &City) -> anyhow::Result<WeatherSnapshot>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key()?;
    let provider =
        OpenWeatherProvider::with_base_url(api_key, &config.base_url, config.request_timeout())?;

    Ok(Box::new(provider))
}
