//! Return chaining.
//!
//! The return of date `t` is earned by the constituents selected on the
//! previous composed date, priced from that date's close to today's close.
//! Constituents missing either close are left out of both the weighted sum
//! and the weight total, so the realized return is renormalized over the
//! constituents that actually traded.

use crate::prices::PriceIndex;
use crate::types::{CompositionEntry, PerformanceEntry};
use chrono::NaiveDate;
use tracing::debug;

/// Index level carried from one processed date to the next.
///
/// Holds the value together with its cumulative return so that
/// `value == base * (1 + cumulative_return)` holds exactly for every level
/// the chain produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexLevel {
    /// Index value.
    pub value: f64,
    /// Return since the anchor.
    pub cumulative_return: f64,
}

impl IndexLevel {
    /// Level on the anchor date.
    pub const fn base(base_value: f64) -> Self {
        Self {
            value: base_value,
            cumulative_return: 0.0,
        }
    }

    /// Normalize a raw index value against `base_value`.
    ///
    /// The cumulative return is derived from the raw value and the stored
    /// value is re-derived from the cumulative return.
    pub fn from_value(raw_value: f64, base_value: f64) -> Self {
        let cumulative_return = raw_value / base_value - 1.0;
        Self {
            value: base_value * (1.0 + cumulative_return),
            cumulative_return,
        }
    }

    /// Level restored from a stored performance entry.
    pub const fn from_entry(entry: &PerformanceEntry) -> Self {
        Self {
            value: entry.index_value,
            cumulative_return: entry.cumulative_return,
        }
    }

    /// Apply a daily return. A zero return carries the level forward unchanged.
    pub fn grow(self, daily_return: f64, base_value: f64) -> Self {
        if daily_return == 0.0 {
            return self;
        }
        Self::from_value(self.value * (1.0 + daily_return), base_value)
    }
}

/// Weighted return of a composition between two dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyReturn {
    /// Return normalized by `valid_weight`, zero when nothing was priced.
    pub value: f64,
    /// Sum of weights of constituents with a close on both dates.
    pub valid_weight: f64,
    /// Constituents that contributed.
    pub priced: usize,
    /// Constituents excluded for missing price continuity.
    pub excluded: usize,
}

impl DailyReturn {
    /// Whether no constituent had price continuity.
    pub fn is_stale(&self) -> bool {
        self.valid_weight <= 0.0
    }
}

/// Compute the weight-normalized return of `composition` from `previous_date`
/// to `date`.
pub fn weighted_return(
    composition: &[CompositionEntry],
    prices: &PriceIndex,
    previous_date: NaiveDate,
    date: NaiveDate,
) -> DailyReturn {
    let mut total_return = 0.0;
    let mut valid_weight = 0.0;
    let mut priced = 0;

    for entry in composition {
        let (Some(previous), Some(current)) = (
            prices.close(&entry.symbol, previous_date),
            prices.close(&entry.symbol, date),
        ) else {
            continue;
        };
        if !(previous > 0.0) || !current.is_finite() {
            continue;
        }

        let stock_return = current / previous - 1.0;
        total_return += entry.weight * stock_return;
        valid_weight += entry.weight;
        priced += 1;
    }

    let value = if valid_weight > 0.0 {
        total_return / valid_weight
    } else {
        0.0
    };

    DailyReturn {
        value,
        valid_weight,
        priced,
        excluded: composition.len() - priced,
    }
}

/// Inputs for advancing the chain by one date.
#[derive(Debug, Clone, Copy)]
pub struct ChainStep<'a> {
    /// Date being computed.
    pub date: NaiveDate,
    /// Last date that produced a composition.
    pub previous_date: NaiveDate,
    /// Constituents and weights of `previous_date`.
    pub previous_composition: &'a [CompositionEntry],
    /// Level reached on `previous_date`.
    pub previous_level: IndexLevel,
    /// Number of constituents selected on `date`.
    pub num_constituents: usize,
}

/// Advances the index level from one composed date to the next.
#[derive(Debug, Clone, Copy)]
pub struct ReturnChain {
    base_value: f64,
}

impl ReturnChain {
    /// Create a chain anchored at `base_value`.
    pub const fn new(base_value: f64) -> Self {
        Self { base_value }
    }

    /// Base value of the chain.
    pub const fn base_value(&self) -> f64 {
        self.base_value
    }

    /// Performance of the first processed date.
    pub fn anchor(&self, date: NaiveDate, num_constituents: usize) -> PerformanceEntry {
        let level = IndexLevel::base(self.base_value);
        entry(date, level, 0.0, num_constituents)
    }

    /// Performance of `step.date`, earned by the previous composition.
    ///
    /// When no previous constituent has a close on both dates the daily
    /// return is zero and the previous level is carried forward.
    pub fn advance(&self, step: ChainStep<'_>, prices: &PriceIndex) -> PerformanceEntry {
        let daily = weighted_return(
            step.previous_composition,
            prices,
            step.previous_date,
            step.date,
        );

        if daily.excluded > 0 {
            debug!(
                date = %step.date,
                excluded = daily.excluded,
                priced = daily.priced,
                "constituents without price continuity left out of the return"
            );
        }

        let level = if daily.is_stale() {
            debug!(date = %step.date, "no priced constituents, carrying index level forward");
            step.previous_level
        } else {
            step.previous_level.grow(daily.value, self.base_value)
        };

        entry(step.date, level, daily.value, step.num_constituents)
    }
}

fn entry(
    date: NaiveDate,
    level: IndexLevel,
    daily_return: f64,
    num_constituents: usize,
) -> PerformanceEntry {
    PerformanceEntry {
        date,
        index_value: level.value,
        daily_return,
        cumulative_return: level.cumulative_return,
        num_constituents: num_constituents as u32,
    }
}
