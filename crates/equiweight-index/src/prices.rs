//! In-memory price history keyed by date and symbol.
//!
//! The whole date range is loaded once; selection and return chaining then
//! run as pure lookups instead of per-symbol storage queries.

use crate::types::PriceRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Price history indexed by `(date, symbol)`.
///
/// Records of a date are kept in ascending symbol order, which is the input
/// order handed to the selector and hence the tie-break order for equal
/// market caps.
#[derive(Debug, Clone, Default)]
pub struct PriceIndex {
    by_date: BTreeMap<NaiveDate, BTreeMap<String, PriceRecord>>,
}

impl PriceIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from records. A later record for the same
    /// `(symbol, date)` replaces an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = PriceRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Insert or replace a record.
    pub fn insert(&mut self, record: PriceRecord) {
        self.by_date
            .entry(record.date)
            .or_default()
            .insert(record.symbol.clone(), record);
    }

    /// Distinct trading dates in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    /// Distinct trading dates within `[start, end]`.
    pub fn dates_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        self.by_date.range(start..=end).map(|(d, _)| *d).collect()
    }

    /// All records of a date in ascending symbol order.
    pub fn records_on(&self, date: NaiveDate) -> impl Iterator<Item = &PriceRecord> + '_ {
        self.by_date
            .get(&date)
            .into_iter()
            .flat_map(|records| records.values())
    }

    /// Record for a symbol on a date.
    pub fn get(&self, symbol: &str, date: NaiveDate) -> Option<&PriceRecord> {
        self.by_date.get(&date)?.get(symbol)
    }

    /// Closing price for a symbol on a date, if one was recorded.
    pub fn close(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        self.get(symbol, date).and_then(|r| r.close)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.by_date.values().map(BTreeMap::len).sum()
    }

    /// Whether the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

impl FromIterator<PriceRecord> for PriceIndex {
    fn from_iter<I: IntoIterator<Item = PriceRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}
