//! Conversion of quote frames into price records.
//!
//! The close used by the index is the split and dividend adjusted close; the
//! daily market cap is that close times a constant share count.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use equiweight_index::PriceRecord;
use polars::prelude::*;

/// Last finite adjusted close of a quote frame.
pub fn last_close(df: &DataFrame) -> Result<Option<f64>> {
    let closes = df.column("adjusted_close")?.f64()?;
    Ok(closes.into_iter().flatten().filter(|c| c.is_finite()).last())
}

/// Add `market_cap` and `shares_outstanding` columns to a quote frame.
pub fn with_market_cap(df: DataFrame, shares_outstanding: f64) -> Result<DataFrame> {
    let df = df
        .lazy()
        .with_columns([
            (col("adjusted_close") * lit(shares_outstanding)).alias("market_cap"),
            lit(shares_outstanding).alias("shares_outstanding"),
        ])
        .collect()?;
    Ok(df)
}

/// Turn a quote frame into price records with a daily market cap.
///
/// Non-finite prices become `None`, which keeps the row out of selection and
/// out of the return chain.
pub fn price_records(df: DataFrame, shares_outstanding: f64) -> Result<Vec<PriceRecord>> {
    let df = with_market_cap(df, shares_outstanding)?;

    let symbols = df.column("symbol")?.str()?;
    let dates = df.column("date")?.cast(&DataType::String)?;
    let dates = dates.str()?;
    let opens = df.column("open")?.f64()?;
    let highs = df.column("high")?.f64()?;
    let lows = df.column("low")?.f64()?;
    let closes = df.column("adjusted_close")?.f64()?;
    let volumes = df.column("volume")?.cast(&DataType::UInt64)?;
    let volumes = volumes.u64()?;
    let market_caps = df.column("market_cap")?.f64()?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let symbol = symbols
            .get(i)
            .ok_or_else(|| DataError::Parse("Missing symbol".to_string()))?;
        let date = dates
            .get(i)
            .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| DataError::Parse(format!("Invalid date {date}: {e}")))?;

        records.push(PriceRecord {
            symbol: symbol.to_string(),
            date,
            open: finite(opens.get(i)),
            high: finite(highs.get(i)),
            low: finite(lows.get(i)),
            close: finite(closes.get(i)),
            volume: volumes.get(i).unwrap_or(0),
            market_cap: finite(market_caps.get(i)).unwrap_or(0.0),
            shares_outstanding,
        });
    }

    Ok(records)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yahoo::quotes::quote_frame;
    use approx::assert_relative_eq;

    fn frame() -> DataFrame {
        quote_frame(
            "MSFT",
            vec![1_704_205_800, 1_704_292_200, 1_704_378_600],
            vec![373.0, 369.0, 370.0],
            vec![375.0, 373.0, 372.0],
            vec![366.0, 368.0, 367.0],
            vec![370.9, 370.6, 367.9],
            vec![25_258_600, 23_083_500, 20_901_500],
            vec![368.0, 367.7, f64::NAN],
        )
        .unwrap()
    }

    #[test]
    fn test_price_records_carry_market_cap() {
        let records = price_records(frame(), 7.43e9).unwrap();

        assert_eq!(records.len(), 3);
        let first = &records[0];
        assert_eq!(first.symbol, "MSFT");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(first.close, Some(368.0));
        assert_eq!(first.volume, 25_258_600);
        assert_relative_eq!(first.market_cap, 368.0 * 7.43e9, max_relative = 1e-12);
        assert!(first.is_eligible());
    }

    #[test]
    fn test_non_finite_close_is_ineligible() {
        let records = price_records(frame(), 7.43e9).unwrap();
        let last = &records[2];
        assert_eq!(last.close, None);
        assert_eq!(last.market_cap, 0.0);
        assert!(!last.is_eligible());
    }

    #[test]
    fn test_last_close_skips_nulls() {
        let df = df! {
            "adjusted_close" => [Some(10.0), Some(11.0), Some(f64::NAN), None],
        }
        .unwrap();
        assert_eq!(last_close(&df).unwrap(), Some(11.0));
    }
}
