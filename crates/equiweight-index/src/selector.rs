//! Constituent selection.
//!
//! Ranks the eligible records of a date by market cap and keeps the largest
//! N at equal weight.

use crate::types::{CompositionEntry, PriceRecord};
use chrono::NaiveDate;

/// Outcome of selecting constituents for a date.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Entries ordered by rank; never empty.
    Constituents(Vec<CompositionEntry>),
    /// No record passed the eligibility predicate; the date is skipped.
    NoEligibleConstituents,
}

impl Selection {
    /// Selected entries, empty when the date was skipped.
    pub fn entries(&self) -> &[CompositionEntry] {
        match self {
            Self::Constituents(entries) => entries,
            Self::NoEligibleConstituents => &[],
        }
    }

    /// Consume the selection, returning the entries if any were selected.
    pub fn into_entries(self) -> Option<Vec<CompositionEntry>> {
        match self {
            Self::Constituents(entries) => Some(entries),
            Self::NoEligibleConstituents => None,
        }
    }
}

/// Select the top `size` eligible records of `date` by market cap.
///
/// Records failing [`PriceRecord::is_eligible`] are dropped. The sort is
/// stable, so records with exactly equal market caps keep their input order.
/// Every selected entry gets weight `1 / min(size, eligible)`.
pub fn select<'a, I>(date: NaiveDate, records: I, size: usize) -> Selection
where
    I: IntoIterator<Item = &'a PriceRecord>,
{
    let mut eligible: Vec<&PriceRecord> = records
        .into_iter()
        .filter(|r| r.is_eligible())
        .collect();

    if eligible.is_empty() || size == 0 {
        return Selection::NoEligibleConstituents;
    }

    eligible.sort_by(|a, b| b.market_cap.total_cmp(&a.market_cap));
    eligible.truncate(size);

    let weight = 1.0 / eligible.len() as f64;
    let entries = eligible
        .into_iter()
        .enumerate()
        .map(|(i, r)| CompositionEntry {
            date,
            symbol: r.symbol.clone(),
            rank: (i + 1) as u32,
            market_cap: r.market_cap,
            weight,
        })
        .collect();

    Selection::Constituents(entries)
}
