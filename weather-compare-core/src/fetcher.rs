use crate::{
    Config,
    error::FetchError,
    fetcher::openweather::OpenWeatherFetcher,
    model::{Location, LocationReading},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Source of current weather readings for a single location.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, location: &Location) -> Result<LocationReading, FetchError>;
}

/// Construct the OpenWeather fetcher from config.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<OpenWeatherFetcher> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `weather-compare configure` and enter your API key."
        )
    })?;

    Ok(OpenWeatherFetcher::new(api_key.to_owned()))
}
