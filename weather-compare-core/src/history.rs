//! Persisted comparison history, stored as a CSV file with one row per day.

use std::{
    collections::HashSet,
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    error::HistoryError,
    model::{ComparisonRecord, ComparisonSchema},
};

/// In-memory copy of a history file.
///
/// The schema is unset until the table is loaded from a non-empty file or receives its first
/// record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryTable {
    schema: Option<ComparisonSchema>,
    rows: Vec<ComparisonRecord>,
}

/// Result of [`append_and_save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedHistory {
    pub path: PathBuf,
    pub rows: usize,
    /// `false` when the new record repeated an existing date pair and was dropped.
    pub appended: bool,
}

impl HistoryTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn schema(&self) -> Option<&ComparisonSchema> {
        self.schema.as_ref()
    }

    pub fn rows(&self) -> &[ComparisonRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Load a table from disk. A missing file is an empty table; anything unreadable is an error.
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No history file yet, starting empty");
                return Ok(Self::empty());
            }
            Err(source) => {
                return Err(HistoryError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let csv_error = |source: csv::Error| HistoryError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::Reader::from_reader(file);
        let header = reader.headers().map_err(csv_error)?.clone();
        if header.is_empty() {
            return Ok(Self::empty());
        }

        let columns: Vec<&str> = header.iter().collect();
        let schema =
            ComparisonSchema::from_header(&columns).ok_or_else(|| HistoryError::UnrecognizedHeader {
                path: path.to_path_buf(),
            })?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(csv_error)?;
            let line = record.position().map_or(0, |p| p.line());
            let fields: Vec<&str> = record.iter().collect();

            let row =
                ComparisonRecord::from_row(&fields).map_err(|reason| HistoryError::InvalidRow {
                    path: path.to_path_buf(),
                    line,
                    reason,
                })?;
            rows.push(row);
        }

        Ok(Self {
            schema: Some(schema),
            rows,
        })
    }

    /// Load a table, treating an unset path or any load failure as an empty table.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::empty();
        };

        Self::load(path).unwrap_or_else(|err| {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Ignoring unreadable history file, starting from an empty table"
            );
            Self::empty()
        })
    }

    /// Append a record, then drop every row whose date pair already appeared earlier.
    ///
    /// Returns whether the new record survived deduplication.
    pub fn append(&mut self, record: ComparisonRecord) -> Result<bool, HistoryError> {
        let incoming = record.schema();
        match &self.schema {
            Some(existing) if *existing != incoming => {
                return Err(HistoryError::SchemaMismatch {
                    existing: existing.clone(),
                    incoming,
                });
            }
            Some(_) => {}
            None => self.schema = Some(incoming),
        }

        let key = record.date_key();
        let duplicate = self.rows.iter().any(|row| row.date_key() == key);

        self.rows.push(record);
        self.drop_duplicate_dates();

        Ok(!duplicate)
    }

    fn drop_duplicate_dates(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.date_key()));
    }

    /// Overwrite `path` with this table.
    ///
    /// Rows go to a sibling temporary file first, which then replaces the destination.
    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        let io_error = |source: io::Error| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let tmp = temp_path(path);
        if let Err(err) = self.write_csv(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        if let Err(source) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(source));
        }
        tracing::debug!(path = %path.display(), rows = self.rows.len(), "Saved history");

        Ok(())
    }

    fn write_csv(&self, tmp: &Path, path: &Path) -> Result<(), HistoryError> {
        let csv_error = |source: csv::Error| HistoryError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::Writer::from_path(tmp).map_err(csv_error)?;

        if let Some(schema) = &self.schema {
            writer.write_record(schema.columns()).map_err(csv_error)?;
            for row in &self.rows {
                writer.write_record(row.to_row()).map_err(csv_error)?;
            }
        }

        writer.flush().map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// File the table is written to when no path is configured.
pub fn default_history_path(schema: &ComparisonSchema) -> PathBuf {
    PathBuf::from(schema.default_file_name())
}

/// Append `record` to `table` and write the table to `path`, or to the default file for the
/// record's location pair when no path is given.
pub fn append_and_save(
    table: &mut HistoryTable,
    record: ComparisonRecord,
    path: Option<&Path>,
) -> Result<SavedHistory, HistoryError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_history_path(&record.schema()));

    let appended = table.append(record)?;
    table.save(&path)?;

    Ok(SavedHistory {
        path,
        rows: table.len(),
        appended,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
