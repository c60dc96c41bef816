//! Error types for index construction.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that abort index construction.
///
/// Dates without eligible constituents and symbols without price continuity
/// are routine and never surface here.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The chain was asked to advance past a date with no stored composition.
    #[error("No composition stored for {previous_date}, cannot advance the index to {date}")]
    NoPriorComposition {
        /// Date being computed
        date: NaiveDate,
        /// Date whose composition is missing
        previous_date: NaiveDate,
    },

    /// Storage failure while reading or replacing a date.
    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: NaiveDate,
        /// End date of the range
        end: NaiveDate,
    },
}

impl IndexError {
    /// Wrap a storage backend error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }
}

/// A run that stopped on a fatal error.
///
/// Carries the last date whose composition and performance were committed so
/// the caller can report where the series ends.
#[derive(Debug, Error)]
#[error("Index run failed (last processed date: {}): {source}", display_date(.last_processed))]
pub struct RunFailure {
    /// Last date fully written before the failure.
    pub last_processed: Option<NaiveDate>,
    /// What went wrong.
    #[source]
    pub source: IndexError,
}

fn display_date(date: &Option<NaiveDate>) -> String {
    date.map_or_else(|| "none".to_string(), |d| d.to_string())
}
