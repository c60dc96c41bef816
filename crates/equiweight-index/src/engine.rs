//! Forward pass over a date range.
//!
//! Each date is selected, chained against the last composed date and written
//! through the store before the next date is touched.

use crate::chain::{ChainStep, IndexLevel, ReturnChain};
use crate::config::IndexConfig;
use crate::error::{IndexError, Result, RunFailure};
use crate::prices::PriceIndex;
use crate::selector::{Selection, select};
use crate::store::IndexStore;
use crate::types::PerformanceEntry;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Where the chain starts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ChainSeed {
    /// The first composed date is the anchor at the base value.
    #[default]
    Base,
    /// Continue from a previously stored level.
    Resume {
        /// Last composed date before the range.
        date: NaiveDate,
        /// Level reached on that date.
        level: IndexLevel,
    },
}

impl ChainSeed {
    /// Seed from a stored performance entry.
    pub const fn from_entry(entry: &PerformanceEntry) -> Self {
        Self::Resume {
            date: entry.date,
            level: IndexLevel::from_entry(entry),
        }
    }
}

/// Why a date produced no composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No record passed the eligibility predicate.
    NoEligibleConstituents,
}

/// Result of processing one date.
#[derive(Debug, Clone, PartialEq)]
pub enum DayOutcome {
    /// Composition and performance were written.
    Computed(PerformanceEntry),
    /// Nothing was written for the date.
    Skipped {
        /// The skipped date
        date: NaiveDate,
        /// Why it was skipped
        reason: SkipReason,
    },
}

impl DayOutcome {
    /// Date the outcome refers to.
    pub const fn date(&self) -> NaiveDate {
        match self {
            Self::Computed(perf) => perf.date,
            Self::Skipped { date, .. } => *date,
        }
    }
}

/// Summary of a completed or cancelled run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    /// Per-date outcomes in date order.
    pub days: Vec<DayOutcome>,
    /// Last date whose composition and performance were written.
    pub last_processed: Option<NaiveDate>,
    /// Whether the run stopped at a cancellation point.
    pub cancelled: bool,
}

impl RunOutcome {
    /// Computed performance entries.
    pub fn computed(&self) -> impl Iterator<Item = &PerformanceEntry> + '_ {
        self.days.iter().filter_map(|day| match day {
            DayOutcome::Computed(perf) => Some(perf),
            DayOutcome::Skipped { .. } => None,
        })
    }

    /// Dates skipped for lack of eligible constituents.
    pub fn skipped(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().filter_map(|day| match day {
            DayOutcome::Skipped { date, .. } => Some(*date),
            DayOutcome::Computed(_) => None,
        })
    }

    /// Final computed performance.
    pub fn last_performance(&self) -> Option<&PerformanceEntry> {
        self.computed().last()
    }
}

/// Options of a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions<'a> {
    /// Chain seed.
    pub seed: ChainSeed,
    /// Checked between dates; when set the run stops and returns normally.
    pub cancel: Option<&'a AtomicBool>,
}

/// Builds the index over a date range.
#[derive(Debug, Clone, Copy)]
pub struct IndexEngine {
    config: IndexConfig,
    chain: ReturnChain,
}

impl IndexEngine {
    /// Create an engine, validating the configuration.
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            chain: ReturnChain::new(config.base_value),
        })
    }

    /// Engine configuration.
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Run over `[start, end]` anchoring at the base value.
    pub fn run<S: IndexStore>(
        &self,
        prices: &PriceIndex,
        store: &mut S,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<RunOutcome, RunFailure> {
        self.run_with(prices, store, start, end, RunOptions::default())
    }

    /// Run over `[start, end]`.
    ///
    /// Dates are the distinct trading dates of `prices` within the range.
    /// Every composed date is written through [`IndexStore::replace_day`],
    /// so a failure leaves all earlier dates committed and the failing date
    /// untouched. Skipped dates are cleared of rows from earlier runs.
    pub fn run_with<S: IndexStore>(
        &self,
        prices: &PriceIndex,
        store: &mut S,
        start: NaiveDate,
        end: NaiveDate,
        options: RunOptions<'_>,
    ) -> std::result::Result<RunOutcome, RunFailure> {
        if start > end {
            return Err(RunFailure {
                last_processed: None,
                source: IndexError::InvalidDateRange { start, end },
            });
        }

        let dates = prices.dates_between(start, end);
        if dates.is_empty() {
            warn!(%start, %end, "no trading dates in range");
            return Ok(RunOutcome::default());
        }
        info!(
            days = dates.len(),
            first = %dates[0],
            size = self.config.size,
            "computing index"
        );

        let mut outcome = RunOutcome::default();
        let mut previous = match options.seed {
            ChainSeed::Base => None,
            ChainSeed::Resume { date, level } => Some((date, level)),
        };

        for (i, date) in dates.iter().copied().enumerate() {
            if options.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                info!(%date, "run cancelled before date");
                outcome.cancelled = true;
                break;
            }

            let result = self.process_day(prices, store, date, previous);
            match result {
                Ok(day @ DayOutcome::Skipped { .. }) => {
                    warn!(%date, "no eligible constituents, date skipped");
                    outcome.days.push(day);
                }
                Ok(DayOutcome::Computed(perf)) => {
                    previous = Some((date, IndexLevel::from_entry(&perf)));
                    outcome.last_processed = Some(date);
                    if i % 5 == 0 || i + 1 == dates.len() {
                        info!(
                            processed = i + 1,
                            total = dates.len(),
                            index_value = perf.index_value,
                            "index progress"
                        );
                    }
                    outcome.days.push(DayOutcome::Computed(perf));
                }
                Err(source) => {
                    return Err(RunFailure {
                        last_processed: outcome.last_processed,
                        source,
                    });
                }
            }
        }

        if let Some(perf) = outcome.last_performance() {
            info!(
                date = %perf.date,
                index_value = perf.index_value,
                skipped = outcome.skipped().count(),
                "index calculation completed"
            );
        }
        Ok(outcome)
    }

    fn process_day<S: IndexStore>(
        &self,
        prices: &PriceIndex,
        store: &mut S,
        date: NaiveDate,
        previous: Option<(NaiveDate, IndexLevel)>,
    ) -> Result<DayOutcome> {
        let entries = match select(date, prices.records_on(date), self.config.size) {
            Selection::Constituents(entries) => entries,
            Selection::NoEligibleConstituents => {
                store.clear_day(date)?;
                return Ok(DayOutcome::Skipped {
                    date,
                    reason: SkipReason::NoEligibleConstituents,
                });
            }
        };
        debug!(%date, constituents = entries.len(), "selected constituents");

        let performance = match previous {
            None => self.chain.anchor(date, entries.len()),
            Some((previous_date, previous_level)) => {
                let previous_composition = store.composition(previous_date)?;
                if previous_composition.is_empty() {
                    return Err(IndexError::NoPriorComposition {
                        date,
                        previous_date,
                    });
                }
                self.chain.advance(
                    ChainStep {
                        date,
                        previous_date,
                        previous_composition: &previous_composition,
                        previous_level,
                        num_constituents: entries.len(),
                    },
                    prices,
                )
            }
        };

        store.replace_day(date, &entries, &performance)?;
        Ok(DayOutcome::Computed(performance))
    }
}
