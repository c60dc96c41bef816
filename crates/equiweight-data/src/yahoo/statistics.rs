//! Key statistics from the Yahoo Finance quoteSummary endpoint.
//!
//! Only the share counts and market cap are read; they are what turns a
//! daily close into a daily market cap.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";

/// Share counts and size reported for a symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStatistics {
    /// Stock symbol
    pub symbol: String,
    /// Shares outstanding
    pub shares_outstanding: Option<f64>,
    /// Implied shares outstanding
    pub implied_shares_outstanding: Option<f64>,
    /// Float shares
    pub float_shares: Option<f64>,
    /// Market capitalization
    pub market_cap: Option<f64>,
}

/// Which statistic produced the share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareSource {
    /// `sharesOutstanding`
    SharesOutstanding,
    /// `impliedSharesOutstanding`
    ImpliedSharesOutstanding,
    /// `floatShares`
    FloatShares,
    /// `marketCap / last close`
    MarketCapOverClose,
}

impl KeyStatistics {
    /// Resolve the share count used for daily market caps.
    ///
    /// Tries shares outstanding, implied shares outstanding, float shares and
    /// finally market cap divided by `last_close`, taking the first positive
    /// value. Returns `None` when nothing usable is reported.
    pub fn resolve_shares(&self, last_close: Option<f64>) -> Option<(f64, ShareSource)> {
        let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);

        if let Some(shares) = positive(self.shares_outstanding) {
            return Some((shares, ShareSource::SharesOutstanding));
        }
        if let Some(shares) = positive(self.implied_shares_outstanding) {
            return Some((shares, ShareSource::ImpliedSharesOutstanding));
        }
        if let Some(shares) = positive(self.float_shares) {
            return Some((shares, ShareSource::FloatShares));
        }
        let market_cap = positive(self.market_cap)?;
        let close = positive(last_close)?;
        Some((market_cap / close, ShareSource::MarketCapOverClose))
    }

    /// Parse a quoteSummary response body.
    pub fn from_quote_summary(symbol: &str, body: &str) -> Result<Self> {
        let response: QuoteSummaryResponse = serde_json::from_str(body)?;

        if let Some(error) = response.quote_summary.error {
            return Err(DataError::YahooApi(format!(
                "{symbol}: {}",
                error.description.unwrap_or(error.code)
            )));
        }

        let result = response
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "empty quoteSummary result".to_string(),
            })?;

        let stats = result.default_key_statistics.unwrap_or_default();
        let price = result.price.unwrap_or_default();

        Ok(Self {
            symbol: symbol.to_string(),
            shares_outstanding: stats.shares_outstanding.and_then(|v| v.raw),
            implied_shares_outstanding: stats.implied_shares_outstanding.and_then(|v| v.raw),
            float_shares: stats.float_shares.and_then(|v| v.raw),
            market_cap: price.market_cap.and_then(|v| v.raw),
        })
    }
}

/// Fetches [`KeyStatistics`] over HTTP.
#[derive(Debug, Clone)]
pub struct YahooStatisticsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooStatisticsProvider {
    /// Create a provider pointed at Yahoo Finance.
    pub fn new() -> Result<Self> {
        Self::with_base_url(QUOTE_SUMMARY_URL)
    }

    /// Create a provider pointed at another quoteSummary-compatible endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch key statistics for a symbol.
    pub async fn fetch_statistics(&self, symbol: &str) -> Result<KeyStatistics> {
        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let url = format!("{}/{symbol}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("modules", "defaultKeyStatistics,price")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DataError::Http(format!("{symbol}: HTTP {status}")));
        }

        let stats = KeyStatistics::from_quote_summary(symbol, &body)?;
        debug!(
            symbol,
            shares_outstanding = ?stats.shares_outstanding,
            market_cap = ?stats.market_cap,
            "fetched key statistics"
        );
        Ok(stats)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<QuoteSummaryError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    default_key_statistics: Option<DefaultKeyStatistics>,
    price: Option<PriceModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefaultKeyStatistics {
    shares_outstanding: Option<RawValue>,
    implied_shares_outstanding: Option<RawValue>,
    float_shares: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const AAPL_SUMMARY: &str = r#"{
        "quoteSummary": {
            "result": [{
                "defaultKeyStatistics": {
                    "sharesOutstanding": {"raw": 15204100096, "fmt": "15.2B"},
                    "impliedSharesOutstanding": {"raw": 15408100352, "fmt": "15.41B"},
                    "floatShares": {"raw": 15179439321, "fmt": "15.18B"}
                },
                "price": {
                    "marketCap": {"raw": 3466534633472, "fmt": "3.47T"}
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_quote_summary() {
        let stats = KeyStatistics::from_quote_summary("AAPL", AAPL_SUMMARY).unwrap();
        assert_eq!(stats.symbol, "AAPL");
        assert_eq!(stats.shares_outstanding, Some(15_204_100_096.0));
        assert_eq!(stats.float_shares, Some(15_179_439_321.0));
        assert_eq!(stats.market_cap, Some(3_466_534_633_472.0));
    }

    #[test]
    fn test_parse_missing_modules() {
        let body = r#"{"quoteSummary": {"result": [{"price": {"marketCap": {}}}], "error": null}}"#;
        let stats = KeyStatistics::from_quote_summary("XYZ", body).unwrap();
        assert_eq!(stats.shares_outstanding, None);
        assert_eq!(stats.market_cap, None);
    }

    #[test]
    fn test_parse_error_payload() {
        let body = r#"{"quoteSummary": {"result": null, "error": {"code": "Not Found", "description": "Quote not found for symbol: ZZZZ"}}}"#;
        let err = KeyStatistics::from_quote_summary("ZZZZ", body).unwrap_err();
        assert!(matches!(err, DataError::YahooApi(msg) if msg.contains("Quote not found")));
    }

    #[rstest]
    #[case(Some(10.0), Some(20.0), Some(30.0), Some(4000.0), Some((10.0, ShareSource::SharesOutstanding)))]
    #[case(Some(0.0), Some(20.0), Some(30.0), Some(4000.0), Some((20.0, ShareSource::ImpliedSharesOutstanding)))]
    #[case(None, None, Some(30.0), Some(4000.0), Some((30.0, ShareSource::FloatShares)))]
    #[case(None, Some(0.0), None, Some(4000.0), Some((40.0, ShareSource::MarketCapOverClose)))]
    #[case(None, None, None, Some(0.0), None)]
    #[case(None, None, None, None, None)]
    fn test_share_fallback_order(
        #[case] shares_outstanding: Option<f64>,
        #[case] implied_shares_outstanding: Option<f64>,
        #[case] float_shares: Option<f64>,
        #[case] market_cap: Option<f64>,
        #[case] expected: Option<(f64, ShareSource)>,
    ) {
        let stats = KeyStatistics {
            symbol: "T".to_string(),
            shares_outstanding,
            implied_shares_outstanding,
            float_shares,
            market_cap,
        };
        assert_eq!(stats.resolve_shares(Some(100.0)), expected);
    }

    #[test]
    fn test_market_cap_fallback_needs_a_close() {
        let stats = KeyStatistics {
            market_cap: Some(4000.0),
            ..KeyStatistics::default()
        };
        assert_eq!(stats.resolve_shares(None), None);
        assert_eq!(stats.resolve_shares(Some(0.0)), None);
    }

    #[tokio::test]
    async fn test_invalid_symbol() {
        let provider = YahooStatisticsProvider::new().unwrap();
        let result = provider.fetch_statistics("").await;
        assert!(matches!(result, Err(DataError::InvalidSymbol(_))));
    }
}
