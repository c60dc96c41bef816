//! CSV and JSON export of the index tables.

use crate::changes::{CompositionChange, DailyComposition};
use crate::summary::{IndexSummary, SummaryMetric};
use chrono::NaiveDate;
use equiweight_index::PerformanceEntry;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output was not valid UTF-8.
    #[error("Invalid UTF-8 in output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "prettyjson" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Performance row with returns in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    /// Date.
    pub date: NaiveDate,
    /// Index level.
    pub index_value: f64,
    /// Daily return in percent.
    pub daily_return_pct: f64,
    /// Cumulative return in percent.
    pub cumulative_return_pct: f64,
}

impl From<&PerformanceEntry> for PerformanceRow {
    fn from(entry: &PerformanceEntry) -> Self {
        Self {
            date: entry.date,
            index_value: entry.index_value,
            daily_return_pct: entry.daily_return * 100.0,
            cumulative_return_pct: entry.cumulative_return * 100.0,
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn to_csv<T: Serialize>(records: &[T], headers: &[&str]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    if records.is_empty() {
        wtr.write_record(headers)?;
    }
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn export_records<T: Serialize>(
    records: &[T],
    headers: &[&str],
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(records, headers),
        ExportFormat::Json => Ok(serde_json::to_string(records)?),
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(records)?),
    }
}

impl Exporter for Vec<PerformanceRow> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        export_records(
            self,
            &[
                "date",
                "index_value",
                "daily_return_pct",
                "cumulative_return_pct",
            ],
            format,
        )
    }
}

impl Exporter for Vec<DailyComposition> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        export_records(self, &["date", "constituents"], format)
    }
}

impl Exporter for Vec<CompositionChange> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        export_records(
            self,
            &[
                "date",
                "tickers_added",
                "tickers_removed",
                "num_added",
                "num_removed",
                "change_type",
            ],
            format,
        )
    }
}

impl Exporter for IndexSummary {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv::<SummaryMetric>(&self.metrics(), &["metric", "value"]),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Everything written by a full export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    /// Performance rows.
    pub performance: Vec<PerformanceRow>,
    /// One row per composed date.
    pub compositions: Vec<DailyComposition>,
    /// Changes between consecutive snapshots.
    pub changes: Vec<CompositionChange>,
    /// Summary metrics.
    pub summary: IndexSummary,
}

impl ExportBundle {
    /// Write every table into `dir`, creating it if needed.
    ///
    /// Returns the written paths in order: `index_performance`,
    /// `daily_composition`, `composition_changes`, `summary_metrics`.
    pub fn write_all(&self, dir: &Path, format: ExportFormat) -> Result<Vec<PathBuf>, ExportError> {
        std::fs::create_dir_all(dir)?;
        let path = |stem: &str| dir.join(format!("{stem}.{}", format.extension()));

        let written = vec![
            path("index_performance"),
            path("daily_composition"),
            path("composition_changes"),
            path("summary_metrics"),
        ];
        self.performance.export_to_file(&written[0], format)?;
        self.compositions.export_to_file(&written[1], format)?;
        self.changes.export_to_file(&written[2], format)?;
        self.summary.export_to_file(&written[3], format)?;

        info!(dir = %dir.display(), files = written.len(), "exported index tables");
        Ok(written)
    }
}
