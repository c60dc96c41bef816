//! Persistence seam for compositions and performance.

use crate::error::Result;
use crate::types::{CompositionEntry, PerformanceEntry};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Storage for the two tables the engine writes.
///
/// `replace_day` and `clear_day` must be atomic: either both tables change for
/// the date, or both keep whatever they held before the call.
pub trait IndexStore {
    /// Composition of a date ordered by rank; empty when none is stored.
    fn composition(&self, date: NaiveDate) -> Result<Vec<CompositionEntry>>;

    /// Performance of a date.
    fn performance(&self, date: NaiveDate) -> Result<Option<PerformanceEntry>>;

    /// Most recent performance strictly before `date`.
    fn latest_performance_before(&self, date: NaiveDate) -> Result<Option<PerformanceEntry>>;

    /// Replace the composition and performance of `date` in one transaction.
    fn replace_day(
        &mut self,
        date: NaiveDate,
        composition: &[CompositionEntry],
        performance: &PerformanceEntry,
    ) -> Result<()>;

    /// Delete the composition and performance of `date` in one transaction.
    fn clear_day(&mut self, date: NaiveDate) -> Result<()>;

    /// Performance entries within `[start, end]` in date order.
    fn performance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceEntry>>;

    /// Compositions within `[start, end]`, grouped by date in date order.
    fn compositions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Vec<CompositionEntry>)>>;
}

/// In-memory store, used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    compositions: BTreeMap<NaiveDate, Vec<CompositionEntry>>,
    performance: BTreeMap<NaiveDate, PerformanceEntry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dates holding a composition.
    pub fn composed_dates(&self) -> Vec<NaiveDate> {
        self.compositions.keys().copied().collect()
    }

    /// Remove the composition of a date, leaving its performance in place.
    pub fn remove_composition(&mut self, date: NaiveDate) -> Option<Vec<CompositionEntry>> {
        self.compositions.remove(&date)
    }
}

impl IndexStore for MemoryStore {
    fn composition(&self, date: NaiveDate) -> Result<Vec<CompositionEntry>> {
        Ok(self.compositions.get(&date).cloned().unwrap_or_default())
    }

    fn performance(&self, date: NaiveDate) -> Result<Option<PerformanceEntry>> {
        Ok(self.performance.get(&date).cloned())
    }

    fn latest_performance_before(&self, date: NaiveDate) -> Result<Option<PerformanceEntry>> {
        Ok(self
            .performance
            .range(..date)
            .next_back()
            .map(|(_, p)| p.clone()))
    }

    fn replace_day(
        &mut self,
        date: NaiveDate,
        composition: &[CompositionEntry],
        performance: &PerformanceEntry,
    ) -> Result<()> {
        let mut entries = composition.to_vec();
        entries.sort_by_key(|e| e.rank);
        self.compositions.insert(date, entries);
        self.performance.insert(date, performance.clone());
        Ok(())
    }

    fn clear_day(&mut self, date: NaiveDate) -> Result<()> {
        self.compositions.remove(&date);
        self.performance.remove(&date);
        Ok(())
    }

    fn performance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceEntry>> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self
            .performance
            .range(start..=end)
            .map(|(_, p)| p.clone())
            .collect())
    }

    fn compositions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Vec<CompositionEntry>)>> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self
            .compositions
            .range(start..=end)
            .map(|(d, entries)| (*d, entries.clone()))
            .collect())
    }
}
