//! Fetching price history and share counts for a universe.
//!
//! Symbols are fetched in batches. Each batch runs concurrently and a fixed
//! pause separates batches to stay under Yahoo's rate limits. A symbol is kept
//! only when both its quote history and a share count are available.

use chrono::NaiveDate;
use equiweight::universe::{Constituent, Sp500Universe};
use equiweight_data::yahoo::{ShareSource, YahooQuoteProvider, YahooStatisticsProvider};
use equiweight_data::{DataError, StockInfo, frames};
use equiweight_index::PriceRecord;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Error type for data pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DataPipelineError {
    /// Data fetch error from Yahoo.
    #[error("Data fetch error: {0}")]
    Fetch(#[from] DataError),
    /// No statistic yielded a usable share count.
    #[error("No valid shares outstanding data for {0}")]
    NoShares(String),
}

/// Configuration for data fetching.
#[derive(Debug, Clone)]
pub(crate) struct FetchConfig {
    /// Symbols fetched concurrently.
    pub batch_size: usize,
    /// Pause after every batch but the last.
    pub batch_delay: Duration,
}

/// Everything fetched for one symbol.
#[derive(Debug)]
struct SymbolData {
    records: Vec<PriceRecord>,
    stock: StockInfo,
    source: ShareSource,
}

/// Result of fetching a universe.
#[derive(Debug, Default)]
pub(crate) struct FetchReport {
    /// Price records of every successful symbol.
    pub records: Vec<PriceRecord>,
    /// One metadata row per successful symbol.
    pub stocks: Vec<StockInfo>,
    /// Symbols that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl FetchReport {
    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First and last date across all records.
    pub(crate) fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date).min()?;
        let last = self.records.iter().map(|r| r.date).max()?;
        Some((first, last))
    }
}

/// Quote and statistics clients used by the pipeline.
#[derive(Debug)]
pub(crate) struct Providers {
    pub quotes: YahooQuoteProvider,
    pub statistics: YahooStatisticsProvider,
}

impl Providers {
    pub(crate) fn new() -> Result<Self, DataError> {
        Ok(Self {
            quotes: YahooQuoteProvider::new()?,
            statistics: YahooStatisticsProvider::new()?,
        })
    }
}

/// Fetch every constituent of `universe` over `[start, end]`.
///
/// Individual failures are logged and collected in the report; the call
/// itself never fails.
pub(crate) async fn fetch_universe(
    providers: &Providers,
    universe: &Sp500Universe,
    start: NaiveDate,
    end: NaiveDate,
    config: &FetchConfig,
    progress: Option<&ProgressBar>,
) -> FetchReport {
    let constituents = universe.constituents();
    let batch_size = config.batch_size.max(1);
    let total_batches = constituents.len().div_ceil(batch_size);
    info!(
        symbols = constituents.len(),
        %start,
        %end,
        batches = total_batches,
        "starting data fetch"
    );

    if let Some(pb) = progress {
        pb.set_length(constituents.len() as u64);
        pb.set_message(format!("Fetching {} symbols...", constituents.len()));
    }

    let mut report = FetchReport::default();
    for (i, batch) in constituents.chunks(batch_size).enumerate() {
        debug!(batch = i + 1, total = total_batches, "processing batch");

        let results: Vec<_> = stream::iter(batch)
            .map(|constituent| async move {
                let result = fetch_symbol(providers, constituent, start, end).await;
                (constituent.symbol.as_str(), result)
            })
            .buffer_unordered(batch_size)
            .collect()
            .await;

        for (symbol, result) in results {
            match result {
                Ok(data) => {
                    debug!(
                        symbol,
                        rows = data.records.len(),
                        source = ?data.source,
                        "fetched symbol"
                    );
                    report.records.extend(data.records);
                    report.stocks.push(data.stock);
                }
                Err(e) => {
                    if let Some(pb) = progress {
                        pb.suspend(|| warn!(symbol, error = %e, "failed to fetch symbol"));
                    } else {
                        warn!(symbol, error = %e, "failed to fetch symbol");
                    }
                    report.failed.push((symbol.to_string(), e.to_string()));
                }
            }
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        if i + 1 < total_batches && !config.batch_delay.is_zero() {
            tokio::time::sleep(config.batch_delay).await;
        }
    }

    info!(
        succeeded = report.stocks.len(),
        failed = report.failed.len(),
        rows = report.records.len(),
        "data fetch completed"
    );
    if !report.failed.is_empty() {
        let symbols: Vec<&str> = report.failed.iter().map(|(s, _)| s.as_str()).collect();
        warn!(?symbols, "failed symbols");
    }
    report
}

async fn fetch_symbol(
    providers: &Providers,
    constituent: &Constituent,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<SymbolData, DataPipelineError> {
    let symbol = constituent.symbol.as_str();
    let quotes = providers.quotes.fetch_quotes(symbol, start, end).await?;
    let last_close = frames::last_close(&quotes)?;

    let statistics = providers.statistics.fetch_statistics(symbol).await?;
    let (shares, source) = statistics
        .resolve_shares(last_close)
        .ok_or_else(|| DataPipelineError::NoShares(symbol.to_string()))?;

    let records = frames::price_records(quotes, shares)?;
    let stock = stock_info(constituent, &records)
        .ok_or_else(|| DataPipelineError::NoShares(symbol.to_string()))?;

    Ok(SymbolData {
        records,
        stock,
        source,
    })
}

/// Metadata row from the constituent and its most recent record.
fn stock_info(constituent: &Constituent, records: &[PriceRecord]) -> Option<StockInfo> {
    let latest = records.iter().max_by_key(|r| r.date)?;
    Some(StockInfo {
        symbol: constituent.symbol.clone(),
        company_name: constituent
            .name
            .clone()
            .unwrap_or_else(|| constituent.symbol.clone()),
        sector: constituent
            .sector
            .map_or_else(|| "Unknown".to_string(), |s| s.name().to_string()),
        market_cap: latest.market_cap,
        last_updated: latest.date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiweight::GicsSector;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_stock_info_uses_latest_record() {
        let constituent = Constituent::new("AAPL", GicsSector::InformationTechnology);
        let records = vec![
            PriceRecord::new("AAPL", d(3), Some(185.0), 2.9e12),
            PriceRecord::new("AAPL", d(2), Some(184.0), 2.8e12),
        ];

        let stock = stock_info(&constituent, &records).unwrap();
        assert_eq!(stock.company_name, "AAPL");
        assert_eq!(stock.sector, "Information Technology");
        assert_eq!(stock.market_cap, 2.9e12);
        assert_eq!(stock.last_updated, d(3));

        assert!(stock_info(&constituent, &[]).is_none());
    }

    #[test]
    fn test_stock_info_unknown_sector() {
        let constituent = Constituent {
            symbol: "XYZ".to_string(),
            name: Some("XYZ Corp".to_string()),
            sector: None,
        };
        let records = vec![PriceRecord::new("XYZ", d(2), Some(10.0), 1.0e9)];

        let stock = stock_info(&constituent, &records).unwrap();
        assert_eq!(stock.company_name, "XYZ Corp");
        assert_eq!(stock.sector, "Unknown");
    }

    #[test]
    fn test_report_date_range() {
        let report = FetchReport {
            records: vec![
                PriceRecord::new("A", d(5), Some(1.0), 1.0),
                PriceRecord::new("B", d(2), Some(1.0), 1.0),
            ],
            ..FetchReport::default()
        };
        assert_eq!(report.date_range(), Some((d(2), d(5))));
        assert!(FetchReport::default().date_range().is_none());
        assert!(FetchReport::default().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_small_universe() {
        let providers = Providers::new().unwrap();
        let universe = Sp500Universe::fallback().take(2);
        let config = FetchConfig {
            batch_size: 2,
            batch_delay: Duration::ZERO,
        };

        let report = fetch_universe(&providers, &universe, d(2), d(31), &config, None).await;
        assert_eq!(report.stocks.len() + report.failed.len(), 2);
    }
}
