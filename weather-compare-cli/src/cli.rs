use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use weather_compare_core::{
    ComparisonJob, ComparisonSchema, Config, HistoryTable, Location, fetcher_from_config,
    history::default_history_path,
    model::DIFF_COLUMNS,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-compare",
    version,
    about = "Daily weather comparison between two locations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and the tracked locations.
    Configure {
        /// First location, e.g. "austin,tx" or "austin,tx,us".
        #[arg(long)]
        first: Option<Location>,

        /// Second location; differences are first minus second.
        #[arg(long)]
        second: Option<Location>,

        /// History file to accumulate rows into.
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Fetch both locations and append today's comparison to the history file.
    Run {
        /// Overrides the configured history file.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Fail instead of starting over when the history file cannot be read.
        #[arg(long)]
        strict: bool,
    },

    /// Print the rows of a history file.
    Show {
        /// Overrides the configured history file.
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure {
                first,
                second,
                history,
            } => configure(first, second, history),
            Command::Run { history, strict } => run(history, strict).await,
            Command::Show { history } => show(history),
        }
    }
}

fn configure(
    first: Option<Location>,
    second: Option<Location>,
    history: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()
        .context("Failed to read API key")?;

    if !api_key.trim().is_empty() {
        config.set_api_key(api_key);
    }
    if let Some(first) = first {
        config.locations.first = first;
    }
    if let Some(second) = second {
        config.locations.second = second;
    }
    if history.is_some() {
        config.history_path = history;
    }

    let path = config.save()?;
    println!(
        "Saved configuration to {} (tracking {} vs {}).",
        path.display(),
        config.locations.first,
        config.locations.second
    );

    Ok(())
}

async fn run(history: Option<PathBuf>, strict: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let fetcher = fetcher_from_config(&config)?;

    let mut job = ComparisonJob::from_config(&config);
    if let Some(history) = history {
        job = job.with_history_path(history);
    }
    if strict {
        job = job.with_strict_history(true);
    }

    let report = job.run_once(&fetcher).await?;
    let diffs = report.record.diffs;

    println!(
        "{} vs {} on {}: temp {:+.2}, humidity {:+}, pressure {:+}, max {:+.2}, min {:+.2}",
        report.record.first.location_key,
        report.record.second.location_key,
        report.record.first.date,
        diffs.temp,
        diffs.humidity,
        diffs.pressure,
        diffs.temp_max,
        diffs.temp_min,
    );
    if !report.appended {
        println!("A row for this date already exists; kept the earlier one.");
    }
    println!("{} row(s) in {}", report.rows, report.path.display());

    Ok(())
}

fn show(history: Option<PathBuf>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let job = ComparisonJob::from_config(&config);

    let path = history.or(job.history_path).unwrap_or_else(|| {
        let schema = ComparisonSchema::new(
            job.locations.first.short_name(),
            job.locations.second.short_name(),
        );
        default_history_path(&schema)
    });

    let table = HistoryTable::load(&path)?;
    let Some(schema) = table.schema() else {
        println!("No history in {}", path.display());
        return Ok(());
    };

    let (first_dt, second_dt) = schema.date_columns();
    println!(
        "{:<14} {:<14} {:>14} {:>14} {:>14} {:>14} {:>14}",
        first_dt,
        second_dt,
        DIFF_COLUMNS[0],
        DIFF_COLUMNS[1],
        DIFF_COLUMNS[2],
        DIFF_COLUMNS[3],
        DIFF_COLUMNS[4],
    );
    for row in table.rows() {
        println!(
            "{:<14} {:<14} {:>14.2} {:>14} {:>14} {:>14.2} {:>14.2}",
            row.first.date.to_string(),
            row.second.date.to_string(),
            row.diffs.temp,
            row.diffs.humidity,
            row.diffs.pressure,
            row.diffs.temp_max,
            row.diffs.temp_min,
        );
    }

    Ok(())
}
