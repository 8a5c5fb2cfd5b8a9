//! Error types for each stage of a comparison run.
//!
//! Every stage has its own error so callers can tell a failed fetch apart from a corrupt
//! history file or a location pair that does not match the table on disk.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::ComparisonSchema;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to send request to OpenWeather for '{location}'")]
    Request {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OpenWeather request for '{location}' failed with status {status}: {body}")]
    Status {
        location: String,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse OpenWeather response for '{location}'")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("OpenWeather returned an out-of-range timestamp {dt} for '{location}'")]
    Timestamp { location: String, dt: i64 },
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Both locations use the short name '{0}', so their columns would collide")]
    NamingConflict(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to access history file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read or write CSV in history file {}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("History file {} does not have a weather comparison header", .path.display())]
    UnrecognizedHeader { path: PathBuf },

    #[error("History file {} line {line}: {reason}", .path.display())]
    InvalidRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// The table on disk was written for a different location pair.
    #[error(
        "History table compares {existing} but the new record compares {incoming}.\n\
         Hint: point the run at a different history file or configure the original locations."
    )]
    SchemaMismatch {
        existing: ComparisonSchema,
        incoming: ComparisonSchema,
    },
}

/// Any failure that aborts a comparison run.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
