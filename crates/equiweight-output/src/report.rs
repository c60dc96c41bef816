//! Run reports for the equal-weighted index.

use crate::summary::IndexSummary;
use chrono::{DateTime, NaiveDate, Utc};
use equiweight_index::{IndexConfig, RunOutcome};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a single engine run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Dates with a written composition and performance.
    pub computed_days: usize,
    /// Dates without eligible constituents.
    pub skipped_dates: Vec<NaiveDate>,
    /// Last written date.
    pub last_processed: Option<NaiveDate>,
    /// Whether the run was interrupted.
    pub cancelled: bool,
}

impl From<&RunOutcome> for RunStats {
    fn from(outcome: &RunOutcome) -> Self {
        Self {
            computed_days: outcome.computed().count(),
            skipped_dates: outcome.skipped().collect(),
            last_processed: outcome.last_processed,
            cancelled: outcome.cancelled,
        }
    }
}

/// A report of an index run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Number of constituents.
    pub index_size: usize,

    /// Starting index level.
    pub base_value: f64,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Run statistics, absent for reports built from stored history only.
    pub run: Option<RunStats>,

    /// Report contents (JSON format).
    pub contents: serde_json::Value,
}

impl Report {
    /// Create a new report.
    pub fn new(config: &IndexConfig, run: Option<RunStats>, contents: serde_json::Value) -> Self {
        Self {
            index_size: config.size,
            base_value: config.base_value,
            timestamp: Utc::now(),
            run,
            contents,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    config: Option<IndexConfig>,
    run: Option<RunStats>,
    summary: Option<IndexSummary>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the index configuration.
    pub const fn config(mut self, config: IndexConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Record the outcome of a run.
    pub fn outcome(mut self, outcome: &RunOutcome) -> Self {
        self.run = Some(RunStats::from(outcome));
        self
    }

    /// Attach the summary metrics.
    pub fn summary(mut self, summary: IndexSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<Report, ReportError> {
        let contents = match self.summary {
            Some(summary) => serde_json::json!({ "summary": serde_json::to_value(summary)? }),
            None => serde_json::Value::Null,
        };
        Ok(Report::new(
            &self.config.unwrap_or_default(),
            self.run,
            contents,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiweight_index::{DayOutcome, PerformanceEntry, SkipReason};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn outcome() -> RunOutcome {
        RunOutcome {
            days: vec![
                DayOutcome::Computed(PerformanceEntry {
                    date: d(2),
                    index_value: 100.0,
                    daily_return: 0.0,
                    cumulative_return: 0.0,
                    num_constituents: 2,
                }),
                DayOutcome::Skipped {
                    date: d(3),
                    reason: SkipReason::NoEligibleConstituents,
                },
            ],
            last_processed: Some(d(2)),
            cancelled: false,
        }
    }

    #[test]
    fn test_run_stats() {
        let stats = RunStats::from(&outcome());
        assert_eq!(stats.computed_days, 1);
        assert_eq!(stats.skipped_dates, vec![d(3)]);
        assert_eq!(stats.last_processed, Some(d(2)));
        assert!(!stats.cancelled);
    }

    #[test]
    fn test_report_builder() {
        let report = ReportBuilder::new()
            .config(IndexConfig::new(50, 1000.0))
            .outcome(&outcome())
            .summary(IndexSummary::compute(&[], &[]))
            .build()
            .unwrap();

        assert_eq!(report.index_size, 50);
        assert_eq!(report.base_value, 1000.0);
        assert_eq!(report.run.as_ref().unwrap().computed_days, 1);
        assert_eq!(report.contents["summary"]["trading_days"], 0);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"skipped_dates\""));
    }

    #[test]
    fn test_default_report_has_no_contents() {
        let report = ReportBuilder::new().build().unwrap();
        assert_eq!(report.index_size, IndexConfig::default().size);
        assert!(report.run.is_none());
        assert!(report.contents.is_null());
    }
}
