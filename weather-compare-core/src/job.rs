//! One fetch-merge-persist cycle for the configured location pair.

use std::path::PathBuf;

use crate::{
    Config,
    error::CompareError,
    fetcher::{WeatherFetcher, fetcher_from_config},
    history::{HistoryTable, append_and_save},
    merge::merge,
    model::{ComparisonRecord, LocationPair},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonJob {
    pub locations: LocationPair,
    pub history_path: Option<PathBuf>,
    pub strict_history: bool,
}

/// What a successful run wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub path: PathBuf,
    pub rows: usize,
    pub appended: bool,
    pub record: ComparisonRecord,
}

impl ComparisonJob {
    pub fn new(locations: LocationPair) -> Self {
        Self {
            locations,
            history_path: None,
            strict_history: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            locations: config.locations.clone(),
            history_path: config.history_path.clone(),
            strict_history: config.strict_history,
        }
    }

    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    pub fn with_strict_history(mut self, strict: bool) -> Self {
        self.strict_history = strict;
        self
    }

    /// Fetch both locations one after the other, merge them and append the result to history.
    ///
    /// Nothing is written unless both fetches and the merge succeed.
    pub async fn run_once(&self, fetcher: &dyn WeatherFetcher) -> Result<RunReport, CompareError> {
        let first = fetcher.fetch(&self.locations.first).await?;
        let second = fetcher.fetch(&self.locations.second).await?;
        let record = merge(first, second)?;

        let path = self.history_path.as_deref();
        let mut table = match path {
            Some(path) if self.strict_history => HistoryTable::load(path)?,
            _ => HistoryTable::load_or_empty(path),
        };

        let saved = append_and_save(&mut table, record.clone(), path)?;

        tracing::info!(
            path = %saved.path.display(),
            rows = saved.rows,
            appended = saved.appended,
            temp_diff = record.diffs.temp,
            "Recorded weather comparison for {} vs {}",
            self.locations.first,
            self.locations.second
        );

        Ok(RunReport {
            path: saved.path,
            rows: saved.rows,
            appended: saved.appended,
            record,
        })
    }

    /// Like [`ComparisonJob::run_once`], reporting only success or failure. The cause is logged.
    pub async fn run(&self, fetcher: &dyn WeatherFetcher) -> bool {
        match self.run_once(fetcher).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, "Weather comparison run failed");
                false
            }
        }
    }
}

/// Run one cycle against OpenWeather using `config`.
pub async fn run(config: &Config) -> bool {
    let fetcher = match fetcher_from_config(config) {
        Ok(fetcher) => fetcher,
        Err(err) => {
            tracing::error!(error = %err, "Weather comparison run failed");
            return false;
        }
    };

    ComparisonJob::from_config(config).run(&fetcher).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{FetchError, HistoryError, MergeError},
        fetcher::openweather::OpenWeatherFetcher,
        model::{Location, LocationReading},
        test_support::CurrentDir,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::fs;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct StubFetcher {
        readings: Vec<LocationReading>,
        unavailable: Option<&'static str>,
    }

    #[async_trait]
    impl WeatherFetcher for StubFetcher {
        async fn fetch(&self, location: &Location) -> Result<LocationReading, FetchError> {
            if self.unavailable == Some(location.city.as_str()) {
                return Err(FetchError::Status {
                    location: location.key(),
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: "upstream unavailable".into(),
                });
            }

            Ok(self
                .readings
                .iter()
                .find(|r| r.location_key == location.key())
                .cloned()
                .expect("stub has a reading for every location"))
        }
    }

    fn reading(key: &str, temp: f64, pressure: i64, humidity: i64) -> LocationReading {
        LocationReading {
            location_key: key.into(),
            date: NaiveDate::from_ymd_opt(2021, 9, 19).unwrap(),
            temp,
            feels_like: temp,
            temp_min: temp - 4.0,
            temp_max: temp + 3.0,
            pressure,
            humidity,
        }
    }

    fn stub() -> StubFetcher {
        StubFetcher {
            readings: vec![
                reading("austin, tx", 92.05, 1011, 43),
                reading("saratoga, ca", 75.0, 1015, 55),
                reading("denver, co", 60.0, 1020, 20),
            ],
            unavailable: None,
        }
    }

    #[tokio::test]
    async fn running_twice_on_the_same_day_keeps_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let job = ComparisonJob::new(LocationPair::default()).with_history_path(&path);
        let fetcher = stub();

        assert!(job.run(&fetcher).await);
        assert!(job.run(&fetcher).await);

        let table = HistoryTable::load(&path).unwrap();
        assert_eq!(table.len(), 1);
        let diffs = table.rows()[0].diffs;
        assert!((diffs.temp - 17.05).abs() < 1e-9);
        assert_eq!(diffs.humidity, -12);
        assert_eq!(diffs.pressure, -4);
    }

    #[tokio::test]
    async fn report_describes_what_was_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let job = ComparisonJob::new(LocationPair::default()).with_history_path(&path);

        let first = job.run_once(&stub()).await.unwrap();
        assert_eq!(first.path, path);
        assert_eq!(first.rows, 1);
        assert!(first.appended);

        let second = job.run_once(&stub()).await.unwrap();
        assert_eq!(second.rows, 1);
        assert!(!second.appended);
    }

    #[tokio::test]
    async fn without_history_path_each_run_rebuilds_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = CurrentDir::enter(dir.path());
        let job = ComparisonJob::new(LocationPair::default());
        let default_path = PathBuf::from("austin_and_saratoga_weather_comparison.csv");

        let austin_at = |temp| StubFetcher {
            readings: vec![
                reading("austin, tx", temp, 1011, 43),
                reading("saratoga, ca", 75.0, 1015, 55),
            ],
            unavailable: None,
        };

        let first = job.run_once(&austin_at(50.0)).await.unwrap();
        assert_eq!(first.path, default_path);
        assert_eq!(first.rows, 1);
        assert!(dir.path().join(&default_path).exists());

        let second = job.run_once(&austin_at(60.0)).await.unwrap();
        assert_eq!(second.path, default_path);
        assert_eq!(second.rows, 1);
        assert!(second.appended);

        let table = HistoryTable::load(&default_path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].first.temp, 60.0);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_existing_history_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let job = ComparisonJob::new(LocationPair::default()).with_history_path(&path);

        assert!(job.run(&stub()).await);
        let before = fs::read(&path).unwrap();

        for city in ["austin", "saratoga"] {
            let fetcher = StubFetcher {
                unavailable: Some(city),
                ..stub()
            };

            assert!(!job.run(&fetcher).await);
            let err = job.run_once(&fetcher).await.unwrap_err();
            assert!(matches!(err, CompareError::Fetch(FetchError::Status { .. })));
        }

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn different_location_pair_is_rejected_for_existing_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");

        let job = ComparisonJob::new(LocationPair::default()).with_history_path(&path);
        assert!(job.run(&stub()).await);
        let before = fs::read(&path).unwrap();

        let other = ComparisonJob::new(LocationPair {
            first: Location::new("denver", "co"),
            second: Location::new("saratoga", "ca"),
        })
        .with_history_path(&path);

        let err = other.run_once(&stub()).await.unwrap_err();
        assert!(matches!(
            err,
            CompareError::History(HistoryError::SchemaMismatch { .. })
        ));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn same_short_name_fails_with_naming_conflict() {
        let fetcher = StubFetcher {
            readings: vec![
                reading("austin, tx", 92.0, 1011, 43),
                reading("austin, mn", 50.0, 1020, 60),
            ],
            unavailable: None,
        };
        let job = ComparisonJob::new(LocationPair {
            first: Location::new("austin", "tx"),
            second: Location::new("austin", "mn"),
        });

        let err = job.run_once(&fetcher).await.unwrap_err();
        assert!(matches!(err, CompareError::Merge(MergeError::NamingConflict(_))));
    }

    #[tokio::test]
    async fn corrupt_history_is_replaced_unless_strict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(&path, "not,a,comparison\n1,2,3\n").unwrap();

        let strict = ComparisonJob::new(LocationPair::default())
            .with_history_path(&path)
            .with_strict_history(true);
        let err = strict.run_once(&stub()).await.unwrap_err();
        assert!(matches!(
            err,
            CompareError::History(HistoryError::UnrecognizedHeader { .. })
        ));

        let lenient = strict.with_strict_history(false);
        let report = lenient.run_once(&stub()).await.unwrap();
        assert_eq!(report.rows, 1);
        assert_eq!(HistoryTable::load(&path).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_without_api_key_fails() {
        assert!(!run(&Config::default()).await);
    }

    #[tokio::test]
    async fn full_cycle_against_openweather_api() {
        let mock_server = MockServer::start().await;

        for (q, temp, pressure, humidity) in
            [("austin,tx,us", 92.05, 1011, 43), ("saratoga,ca,us", 75.0, 1015, 55)]
        {
            Mock::given(method("GET"))
                .and(path("/data/2.5/weather"))
                .and(query_param("q", q))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "dt": 1632009667,
                    "main": {
                        "temp": temp,
                        "feels_like": temp,
                        "temp_min": temp - 4.0,
                        "temp_max": temp + 3.0,
                        "pressure": pressure,
                        "humidity": humidity
                    }
                })))
                .mount(&mock_server)
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history.csv");
        let fetcher = OpenWeatherFetcher::with_base_url("KEY".into(), &mock_server.uri());
        let job = ComparisonJob::new(LocationPair::default()).with_history_path(&history);

        let report = job.run_once(&fetcher).await.unwrap();

        assert_eq!(report.record.first.location_key, "austin, tx");
        assert_eq!(report.record.diffs.pressure, -4);
        assert_eq!(report.record.diffs.humidity, -12);
        assert_eq!(
            HistoryTable::load(&history).unwrap().rows()[0].first.date,
            NaiveDate::from_ymd_opt(2021, 9, 19).unwrap()
        );
    }
}
