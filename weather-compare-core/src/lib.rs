//! Core library for the `weather-compare` job.
//!
//! This crate defines:
//! - Fetching current readings from OpenWeather
//! - Merging two readings into a comparison record with per-metric differences
//! - The CSV history table the records accumulate in
//! - Configuration and the job that ties the steps together
//!
//! It is used by `weather-compare-cli`, but can also be driven directly by a scheduler.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod history;
pub mod job;
pub mod merge;
pub mod model;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{CompareError, FetchError, HistoryError, MergeError};
pub use fetcher::{WeatherFetcher, fetcher_from_config, openweather::OpenWeatherFetcher};
pub use history::{HistoryTable, SavedHistory, append_and_save};
pub use job::{ComparisonJob, RunReport, run};
pub use merge::merge;
pub use model::{
    ComparisonRecord, ComparisonSchema, Location, LocationPair, LocationReading, MetricDiffs,
};
