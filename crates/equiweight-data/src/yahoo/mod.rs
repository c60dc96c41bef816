//! Yahoo Finance data providers.

pub mod quotes;
pub mod statistics;

pub use quotes::{QUOTE_COLUMNS, YahooQuoteProvider};
pub use statistics::{KeyStatistics, ShareSource, YahooStatisticsProvider};
