use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::FetchError,
    model::{Location, LocationReading},
};

use super::WeatherFetcher;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherFetcher {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherFetcher {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the fetcher at another host, e.g. a mock server.
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: i64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
}

#[async_trait]
impl WeatherFetcher for OpenWeatherFetcher {
    async fn fetch(&self, location: &Location) -> Result<LocationReading, FetchError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let query = location.query();

        tracing::debug!(location = %location, "Requesting current weather from OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "imperial"),
            ])
            .send()
            .await
            .map_err(|source| FetchError::Request {
                location: location.key(),
                source,
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|source| FetchError::Request {
            location: location.key(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                location: location.key(),
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).map_err(|source| FetchError::Parse {
                location: location.key(),
                source,
            })?;

        reading_from_response(location, parsed)
    }
}

fn reading_from_response(
    location: &Location,
    parsed: OwCurrentResponse,
) -> Result<LocationReading, FetchError> {
    let observed: DateTime<Utc> =
        DateTime::from_timestamp(parsed.dt, 0).ok_or_else(|| FetchError::Timestamp {
            location: location.key(),
            dt: parsed.dt,
        })?;

    Ok(LocationReading {
        location_key: location.key(),
        date: observed.date_naive(),
        temp: parsed.main.temp,
        feels_like: parsed.main.feels_like,
        temp_min: parsed.main.temp_min,
        temp_max: parsed.main.temp_max,
        pressure: parsed.main.pressure,
        humidity: parsed.main.humidity,
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
