use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Country used when a location does not name one.
pub const DEFAULT_COUNTRY: &str = "us";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Per-location attributes, in the order their columns are interleaved.
const BASE_ATTRIBUTES: [&str; 8] = [
    "temp",
    "feels_like",
    "temp_min",
    "temp_max",
    "pressure",
    "humidity",
    "city, state",
    "dt",
];

pub const DIFF_COLUMNS: [&str; 5] = [
    "temp_diff",
    "humidity_diff",
    "pressure_diff",
    "temp_max_diff",
    "temp_min_diff",
];

/// Number of columns in one persisted comparison row.
pub const COLUMN_COUNT: usize = BASE_ATTRIBUTES.len() * 2 + DIFF_COLUMNS.len();

/// A place the weather service can be queried for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl Location {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            country: default_country(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// `"city, state"`, stored alongside every reading.
    pub fn key(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }

    pub fn short_name(&self) -> &str {
        &self.city
    }

    /// Value of the `q` query parameter.
    pub fn query(&self) -> String {
        format!("{},{},{}", self.city, self.state, self.country)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.state)
    }
}

impl FromStr for Location {
    type Err = anyhow::Error;

    /// Parses `"city,state"` or `"city,state,country"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();

        if parts.iter().any(|p| p.is_empty()) {
            return Err(anyhow::anyhow!(
                "Invalid location '{s}': parts must not be empty. Expected `city,state[,country]`."
            ));
        }

        match parts.as_slice() {
            [city, state] => Ok(Location::new(*city, *state)),
            [city, state, country] => Ok(Location::new(*city, *state).with_country(*country)),
            _ => Err(anyhow::anyhow!(
                "Invalid location '{s}'. Expected `city,state[,country]`, e.g. `austin,tx`."
            )),
        }
    }
}

/// The two tracked locations. Differences are always `first - second`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPair {
    pub first: Location,
    pub second: Location,
}

impl Default for LocationPair {
    fn default() -> Self {
        Self {
            first: Location::new("austin", "tx"),
            second: Location::new("saratoga", "ca"),
        }
    }
}

/// One observation for one location, as returned by the weather service.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationReading {
    pub location_key: String,
    pub date: NaiveDate,
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub humidity: i64,
}

impl LocationReading {
    /// Part of the location key before the first comma.
    pub fn short_name(&self) -> &str {
        self.location_key
            .split_once(',')
            .map_or(self.location_key.as_str(), |(name, _)| name)
    }

    fn to_fields(&self) -> [String; 8] {
        [
            self.temp.to_string(),
            self.feels_like.to_string(),
            self.temp_min.to_string(),
            self.temp_max.to_string(),
            self.pressure.to_string(),
            self.humidity.to_string(),
            self.location_key.clone(),
            self.date.format(DATE_FORMAT).to_string(),
        ]
    }

    fn from_fields(fields: [&str; 8]) -> Result<Self, String> {
        let [temp, feels_like, temp_min, temp_max, pressure, humidity, location_key, date] = fields;

        Ok(Self {
            location_key: location_key.to_string(),
            date: NaiveDate::parse_from_str(date, DATE_FORMAT)
                .map_err(|e| format!("dt: invalid date '{date}': {e}"))?,
            temp: parse_float("temp", temp)?,
            feels_like: parse_float("feels_like", feels_like)?,
            temp_min: parse_float("temp_min", temp_min)?,
            temp_max: parse_float("temp_max", temp_max)?,
            pressure: parse_int("pressure", pressure)?,
            humidity: parse_int("humidity", humidity)?,
        })
    }
}

/// Column layout of a history table, fixed by the short names of the two locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonSchema {
    first: String,
    second: String,
}

impl ComparisonSchema {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    /// All column names: per-attribute pairs `"{first} attr"`, `"{second} attr"`, then the diffs.
    pub fn columns(&self) -> Vec<String> {
        BASE_ATTRIBUTES
            .iter()
            .flat_map(|attr| [format!("{} {attr}", self.first), format!("{} {attr}", self.second)])
            .chain(DIFF_COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    /// The two date columns that identify a row.
    pub fn date_columns(&self) -> (String, String) {
        (format!("{} dt", self.first), format!("{} dt", self.second))
    }

    pub fn default_file_name(&self) -> String {
        format!("{}_and_{}_weather_comparison.csv", self.first, self.second)
    }

    /// Recognise a schema from a CSV header. Returns `None` unless the header matches exactly.
    pub fn from_header(header: &[&str]) -> Option<Self> {
        let first = header.first()?.strip_suffix(" temp")?;
        let second = header.get(1)?.strip_suffix(" temp")?;
        let schema = Self::new(first, second);

        schema
            .columns()
            .iter()
            .map(String::as_str)
            .eq(header.iter().copied())
            .then_some(schema)
    }
}

impl fmt::Display for ComparisonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' vs '{}'", self.first, self.second)
    }
}

/// `first - second` for each compared metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDiffs {
    pub temp: f64,
    pub humidity: i64,
    pub pressure: i64,
    pub temp_max: f64,
    pub temp_min: f64,
}

impl MetricDiffs {
    pub fn between(first: &LocationReading, second: &LocationReading) -> Self {
        Self {
            temp: first.temp - second.temp,
            humidity: first.humidity - second.humidity,
            pressure: first.pressure - second.pressure,
            temp_max: first.temp_max - second.temp_max,
            temp_min: first.temp_min - second.temp_min,
        }
    }
}

/// One row of the history table: both readings for a day plus their differences.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRecord {
    pub first: LocationReading,
    pub second: LocationReading,
    pub diffs: MetricDiffs,
}

impl ComparisonRecord {
    pub fn schema(&self) -> ComparisonSchema {
        ComparisonSchema::new(self.first.short_name(), self.second.short_name())
    }

    /// Dates of both readings; no two rows of a table share this pair.
    pub fn date_key(&self) -> (NaiveDate, NaiveDate) {
        (self.first.date, self.second.date)
    }

    /// Field values in [`ComparisonSchema::columns`] order.
    pub fn to_row(&self) -> Vec<String> {
        let diffs = [
            self.diffs.temp.to_string(),
            self.diffs.humidity.to_string(),
            self.diffs.pressure.to_string(),
            self.diffs.temp_max.to_string(),
            self.diffs.temp_min.to_string(),
        ];

        self.first
            .to_fields()
            .into_iter()
            .zip(self.second.to_fields())
            .flat_map(|(a, b)| [a, b])
            .chain(diffs)
            .collect()
    }

    /// Parse a row written by [`ComparisonRecord::to_row`]. Diff columns are recomputed.
    pub fn from_row(row: &[&str]) -> Result<Self, String> {
        if row.len() != COLUMN_COUNT {
            return Err(format!("expected {COLUMN_COUNT} columns, found {}", row.len()));
        }

        let first: [&str; 8] = std::array::from_fn(|i| row[2 * i]);
        let second: [&str; 8] = std::array::from_fn(|i| row[2 * i + 1]);

        let first = LocationReading::from_fields(first)?;
        let second = LocationReading::from_fields(second)?;
        let diffs = MetricDiffs::between(&first, &second);

        Ok(Self { first, second, diffs })
    }
}

fn parse_float(column: &str, value: &str) -> Result<f64, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{column}: expected a number, got '{value}'"))
}

/// Accepts `1011` as well as `1011.0`.
fn parse_int(column: &str, value: &str) -> Result<i64, String> {
    let value = value.trim();
    if let Ok(v) = value.parse::<i64>() {
        return Ok(v);
    }

    match value.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 => Ok(v as i64),
        _ => Err(format!("{column}: expected an integer, got '{value}'")),
    }
}
