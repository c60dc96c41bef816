//! Record types shared by the engine, the store and the reporting layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily price and size observation for one symbol.
///
/// Produced by the data acquisition layer; `close` and `market_cap` arrive
/// already adjusted, the engine never rewrites them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Ticker symbol.
    pub symbol: String,
    /// Trading date.
    pub date: NaiveDate,
    /// Opening price.
    pub open: Option<f64>,
    /// Session high.
    pub high: Option<f64>,
    /// Session low.
    pub low: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Traded volume.
    pub volume: u64,
    /// Market capitalization on this date.
    pub market_cap: f64,
    /// Shares outstanding used to derive the market cap.
    pub shares_outstanding: f64,
}

impl PriceRecord {
    /// Create a record carrying only a close and a market cap.
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        close: Option<f64>,
        market_cap: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
            market_cap,
            shares_outstanding: 0.0,
        }
    }

    /// Whether the record may enter the index: `market_cap > 0` and `close > 0`.
    ///
    /// NaN values fail both comparisons and are therefore ineligible.
    pub fn is_eligible(&self) -> bool {
        self.market_cap > 0.0 && self.close.is_some_and(|c| c > 0.0)
    }
}

/// One constituent of the index on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionEntry {
    /// Composition date.
    pub date: NaiveDate,
    /// Constituent symbol.
    pub symbol: String,
    /// 1-based rank by descending market cap.
    pub rank: u32,
    /// Market cap used for ranking.
    pub market_cap: f64,
    /// Index weight, `1 / count` for every entry of the date.
    pub weight: f64,
}

/// Index level and returns for one processed date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    /// Processed date.
    pub date: NaiveDate,
    /// Index level, `base_value * (1 + cumulative_return)`.
    pub index_value: f64,
    /// Weight-normalized return of the previous day's constituents.
    pub daily_return: f64,
    /// Return since the anchor date.
    pub cumulative_return: f64,
    /// Number of constituents selected on this date.
    pub num_constituents: u32,
}
