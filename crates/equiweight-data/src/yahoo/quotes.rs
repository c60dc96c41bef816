//! Daily quote history from Yahoo Finance.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// Column order of every quote frame.
pub const QUOTE_COLUMNS: [&str; 8] = [
    "symbol",
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "adjusted_close",
];

/// Yahoo Finance quote provider with optional per-request delay.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    request_delay: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("request_delay", &self.request_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a provider without a per-request delay.
    pub fn new() -> Result<Self> {
        Self::with_request_delay(Duration::ZERO)
    }

    /// Create a provider that sleeps `request_delay` after every request.
    pub fn with_request_delay(request_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            request_delay,
        })
    }

    /// Fetch daily OHLCV data for a single symbol over `[start, end]`.
    ///
    /// # Returns
    /// A DataFrame with the columns of [`QUOTE_COLUMNS`], one row per trading day.
    pub async fn fetch_quotes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let start_time = to_offset_datetime(start)?;
        // Yahoo treats the end bound as exclusive.
        let end_time = to_offset_datetime(end)? + time::Duration::days(1);

        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::YahooApi(e.to_string()))?;

        if quotes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No data returned from Yahoo Finance".to_string(),
            });
        }
        debug!(symbol, rows = quotes.len(), "fetched quote history");

        let timestamps: Vec<i64> = quotes.iter().map(|q| q.timestamp as i64).collect();
        let opens: Vec<f64> = quotes.iter().map(|q| q.open).collect();
        let highs: Vec<f64> = quotes.iter().map(|q| q.high).collect();
        let lows: Vec<f64> = quotes.iter().map(|q| q.low).collect();
        let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
        let volumes: Vec<u64> = quotes.iter().map(|q| q.volume).collect();
        let adj_closes: Vec<f64> = quotes.iter().map(|q| q.adjclose).collect();

        let df = quote_frame(symbol, timestamps, opens, highs, lows, closes, volumes, adj_closes)?;

        if !self.request_delay.is_zero() {
            sleep(self.request_delay).await;
        }

        Ok(df)
    }
}

fn to_offset_datetime(date: NaiveDate) -> Result<time::OffsetDateTime> {
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DataError::TimeConversion(format!("invalid midnight for {date}")))?
        .and_utc()
        .timestamp();
    time::OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| DataError::TimeConversion(e.to_string()))
}

/// Assemble a quote frame from raw columns; `timestamps` are unix seconds.
#[allow(clippy::too_many_arguments)]
pub(crate) fn quote_frame(
    symbol: &str,
    timestamps: Vec<i64>,
    opens: Vec<f64>,
    highs: Vec<f64>,
    lows: Vec<f64>,
    closes: Vec<f64>,
    volumes: Vec<u64>,
    adj_closes: Vec<f64>,
) -> Result<DataFrame> {
    let mut df = DataFrame::new(vec![
        Series::new("timestamp".into(), timestamps).into(),
        Series::new("open".into(), opens).into(),
        Series::new("high".into(), highs).into(),
        Series::new("low".into(), lows).into(),
        Series::new("close".into(), closes).into(),
        Series::new("volume".into(), volumes).into(),
        Series::new("adjusted_close".into(), adj_closes).into(),
    ])?;

    let symbol_col: Column = Series::new("symbol".into(), vec![symbol; df.height()]).into();
    df.with_column(symbol_col)?;

    let df = df
        .lazy()
        .with_column(
            (col("timestamp") * lit(1_000_000_000))
                .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                .cast(DataType::Date)
                .alias("date"),
        )
        .select(QUOTE_COLUMNS.map(col))
        .collect()?;

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn column_names(df: &DataFrame) -> Vec<&str> {
        df.get_column_names().iter().map(|c| c.as_str()).collect()
    }

    #[test]
    fn test_quote_frame_layout() {
        // 2024-01-02 14:30 UTC and 2024-01-03 14:30 UTC
        let df = quote_frame(
            "AAPL",
            vec![1_704_205_800, 1_704_292_200],
            vec![187.0, 184.0],
            vec![188.0, 185.0],
            vec![183.0, 182.0],
            vec![185.6, 184.3],
            vec![82_488_700, 58_414_500],
            vec![185.1, 183.8],
        )
        .unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(column_names(&df), QUOTE_COLUMNS.to_vec());
        let dates = df.column("date").unwrap().cast(&DataType::String).unwrap();
        assert_eq!(dates.str().unwrap().get(0), Some("2024-01-02"));
        assert_eq!(dates.str().unwrap().get(1), Some("2024-01-03"));
    }

    #[test]
    fn test_offset_datetime_is_midnight_utc() {
        let t = to_offset_datetime(day(2)).unwrap();
        assert_eq!(t.unix_timestamp(), 1_704_153_600);
    }

    #[tokio::test]
    async fn test_invalid_date_range() {
        let provider = YahooQuoteProvider::new().unwrap();
        let result = provider.fetch_quotes("AAPL", day(10), day(2)).await;
        assert!(matches!(result, Err(DataError::InvalidDateRange { .. })));
    }

    #[tokio::test]
    async fn test_invalid_symbol() {
        let provider = YahooQuoteProvider::new().unwrap();
        let result = provider.fetch_quotes("", day(2), day(10)).await;
        assert!(matches!(result, Err(DataError::InvalidSymbol(_))));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_quotes() {
        let provider = YahooQuoteProvider::new().unwrap();
        let end = chrono::Utc::now().date_naive();
        let start = end - chrono::Duration::days(30);

        let df = provider.fetch_quotes("AAPL", start, end).await.unwrap();
        assert!(df.height() > 0);
        assert_eq!(column_names(&df), QUOTE_COLUMNS.to_vec());
    }
}
