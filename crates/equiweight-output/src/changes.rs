//! Composition snapshots and the changes between them.

use chrono::NaiveDate;
use equiweight_index::CompositionEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Whether constituents changed between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// At least one symbol entered or left.
    Rebalance,
    /// Same constituents as the prior snapshot.
    #[serde(rename = "No Change")]
    NoChange,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rebalance => write!(f, "Rebalance"),
            Self::NoChange => write!(f, "No Change"),
        }
    }
}

/// Constituent changes of one date against the nearest prior snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionChange {
    /// Date of the later snapshot.
    pub date: NaiveDate,
    /// Symbols that entered, sorted and joined by `, `.
    pub tickers_added: Option<String>,
    /// Symbols that left, sorted and joined by `, `.
    pub tickers_removed: Option<String>,
    /// Number of symbols that entered.
    pub num_added: usize,
    /// Number of symbols that left.
    pub num_removed: usize,
    /// Rebalance or no change.
    pub change_type: ChangeType,
}

/// Constituents of one date in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyComposition {
    /// Composition date.
    pub date: NaiveDate,
    /// Symbols joined by `,` in rank order.
    pub constituents: String,
}

/// Flatten snapshots into one row per date.
pub fn daily_compositions(snapshots: &[(NaiveDate, Vec<CompositionEntry>)]) -> Vec<DailyComposition> {
    snapshots
        .iter()
        .map(|(date, entries)| {
            let mut ranked: Vec<&CompositionEntry> = entries.iter().collect();
            ranked.sort_by_key(|e| e.rank);
            DailyComposition {
                date: *date,
                constituents: ranked
                    .iter()
                    .map(|e| e.symbol.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            }
        })
        .collect()
}

/// Diff each snapshot against the one before it.
///
/// `snapshots` must be in date order. Dates without a snapshot are simply
/// absent, so every diff is against the nearest prior date that has one.
/// Fewer than two snapshots yield no changes.
pub fn composition_changes(
    snapshots: &[(NaiveDate, Vec<CompositionEntry>)],
) -> Vec<CompositionChange> {
    if snapshots.len() < 2 {
        warn!("need at least 2 composition snapshots to calculate changes");
        return Vec::new();
    }

    let changes: Vec<CompositionChange> = snapshots
        .windows(2)
        .map(|pair| {
            let (previous_date, previous) = &pair[0];
            let (date, current) = &pair[1];
            debug!(%previous_date, %date, "comparing compositions");
            diff(*date, previous, current)
        })
        .collect();

    let rebalances = changes
        .iter()
        .filter(|c| c.change_type == ChangeType::Rebalance)
        .count();
    info!(records = changes.len(), rebalances, "composition changes calculated");
    changes
}

fn diff(
    date: NaiveDate,
    previous: &[CompositionEntry],
    current: &[CompositionEntry],
) -> CompositionChange {
    let previous: BTreeSet<&str> = previous.iter().map(|e| e.symbol.as_str()).collect();
    let current: BTreeSet<&str> = current.iter().map(|e| e.symbol.as_str()).collect();

    let added: Vec<&str> = current.difference(&previous).copied().collect();
    let removed: Vec<&str> = previous.difference(&current).copied().collect();

    if !added.is_empty() || !removed.is_empty() {
        info!(%date, added = added.len(), removed = removed.len(), "composition change");
    }

    let join = |symbols: &[&str]| (!symbols.is_empty()).then(|| symbols.join(", "));
    CompositionChange {
        date,
        tickers_added: join(&added),
        tickers_removed: join(&removed),
        num_added: added.len(),
        num_removed: removed.len(),
        change_type: if added.is_empty() && removed.is_empty() {
            ChangeType::NoChange
        } else {
            ChangeType::Rebalance
        },
    }
}
