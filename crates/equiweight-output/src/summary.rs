//! Summary metrics of an index series.
//!
//! Volatility is the sample standard deviation of daily returns annualized
//! with [`ANNUALIZATION_FACTOR`]. The Sharpe-style ratio divides the total
//! return by that volatility without subtracting a risk-free rate.

use crate::changes::{ChangeType, CompositionChange};
use chrono::NaiveDate;
use equiweight_index::PerformanceEntry;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading days per year.
pub const ANNUALIZATION_FACTOR: f64 = 252.0;

/// A single date and its daily return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayReturn {
    /// Date.
    pub date: NaiveDate,
    /// Daily return as a fraction.
    pub daily_return: f64,
}

impl fmt::Display for DayReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2}%)", self.date, self.daily_return * 100.0)
    }
}

/// Headline metrics of an index run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    /// First date with performance.
    pub period_start: Option<NaiveDate>,
    /// Last date with performance.
    pub period_end: Option<NaiveDate>,
    /// Dates whose constituents differ from the prior snapshot.
    pub total_composition_changes: usize,
    /// Date with the highest daily return.
    pub best_day: Option<DayReturn>,
    /// Date with the lowest daily return.
    pub worst_day: Option<DayReturn>,
    /// Cumulative return on the last date.
    pub total_return: f64,
    /// Annualized volatility of daily returns.
    pub annualized_volatility: f64,
    /// Total return over annualized volatility, zero when volatility is zero.
    pub sharpe_ratio: f64,
    /// Number of dates with performance.
    pub trading_days: usize,
    /// Mean daily return.
    pub average_daily_return: f64,
    /// Index level on the last date.
    pub final_index_value: Option<f64>,
}

/// One `metric, value` row of the summary sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryMetric {
    /// Metric name.
    pub metric: String,
    /// Formatted value.
    pub value: String,
}

impl IndexSummary {
    /// Compute the summary of a performance series in date order.
    pub fn compute(performance: &[PerformanceEntry], changes: &[CompositionChange]) -> Self {
        let returns = Array1::from_iter(performance.iter().map(|p| p.daily_return));
        let n = returns.len();

        let day = |p: &PerformanceEntry| DayReturn {
            date: p.date,
            daily_return: p.daily_return,
        };
        // First occurrence wins on ties.
        let best_day = performance
            .iter()
            .reduce(|best, p| if p.daily_return > best.daily_return { p } else { best })
            .map(day);
        let worst_day = performance
            .iter()
            .reduce(|worst, p| if p.daily_return < worst.daily_return { p } else { worst })
            .map(day);

        let total_return = performance.last().map_or(0.0, |p| p.cumulative_return);
        let annualized_volatility = if n >= 2 {
            returns.std(1.0) * ANNUALIZATION_FACTOR.sqrt()
        } else {
            0.0
        };
        let sharpe_ratio = if annualized_volatility > 0.0 {
            total_return / annualized_volatility
        } else {
            0.0
        };

        Self {
            period_start: performance.first().map(|p| p.date),
            period_end: performance.last().map(|p| p.date),
            total_composition_changes: changes
                .iter()
                .filter(|c| c.change_type != ChangeType::NoChange)
                .count(),
            best_day,
            worst_day,
            total_return,
            annualized_volatility,
            sharpe_ratio,
            trading_days: n,
            average_daily_return: returns.mean().unwrap_or(0.0),
            final_index_value: performance.last().map(|p| p.index_value),
        }
    }

    /// Rows of the summary metrics sheet.
    pub fn metrics(&self) -> Vec<SummaryMetric> {
        let row = |metric: &str, value: String| SummaryMetric {
            metric: metric.to_string(),
            value,
        };
        let day = |d: Option<DayReturn>| d.map_or_else(|| "n/a".to_string(), |d| d.to_string());

        vec![
            row(
                "Total Composition Changes",
                self.total_composition_changes.to_string(),
            ),
            row("Best Performing Day", day(self.best_day)),
            row("Worst Performing Day", day(self.worst_day)),
            row(
                "Total Return (%)",
                format!("{:.2}%", self.total_return * 100.0),
            ),
            row(
                "Annualized Volatility (%)",
                format!("{:.2}%", self.annualized_volatility * 100.0),
            ),
            row("Sharpe Ratio", format!("{:.2}", self.sharpe_ratio)),
            row("Number of Trading Days", self.trading_days.to_string()),
            row(
                "Average Daily Return (%)",
                format!("{:.4}%", self.average_daily_return * 100.0),
            ),
        ]
    }

    fn period(&self) -> String {
        match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "no data".to_string(),
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nEqual-Weighted Index Summary\n");
        output.push_str(&format!("Period: {}\n", self.period()));
        output.push_str(&"=".repeat(60));
        output.push('\n');
        if let Some(value) = self.final_index_value {
            output.push_str(&format!("  {:<30} {:>26.2}\n", "Final Index Value", value));
        }
        for m in self.metrics() {
            output.push_str(&format!("  {:<30} {:>26}\n", m.metric, m.value));
        }
        output.push_str(&"=".repeat(60));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Equal-Weighted Index Summary\n\n");
        output.push_str(&format!("**Period:** {}\n\n", self.period()));
        output.push_str("| Metric | Value |\n");
        output.push_str("|--------|-------|\n");
        if let Some(value) = self.final_index_value {
            output.push_str(&format!("| Final Index Value | {value:.2} |\n"));
        }
        for m in self.metrics() {
            output.push_str(&format!("| {} | {} |\n", m.metric, m.value));
        }

        output
    }
}

impl fmt::Display for IndexSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index Summary ({})", self.period())?;
        writeln!(f, "  Total Return: {:.2}%", self.total_return * 100.0)?;
        writeln!(
            f,
            "  Annualized Volatility: {:.2}%",
            self.annualized_volatility * 100.0
        )?;
        writeln!(f, "  Sharpe Ratio: {:.2}", self.sharpe_ratio)?;
        writeln!(f, "  Trading Days: {}", self.trading_days)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series(returns: &[f64]) -> Vec<PerformanceEntry> {
        let mut value = 100.0;
        returns
            .iter()
            .enumerate()
            .map(|(i, r)| {
                value *= 1.0 + r;
                PerformanceEntry {
                    date: d(i as u32 + 2),
                    index_value: value,
                    daily_return: *r,
                    cumulative_return: value / 100.0 - 1.0,
                    num_constituents: 100,
                }
            })
            .collect()
    }

    fn change(date: NaiveDate, change_type: ChangeType) -> CompositionChange {
        CompositionChange {
            date,
            tickers_added: None,
            tickers_removed: None,
            num_added: 0,
            num_removed: 0,
            change_type,
        }
    }

    #[test]
    fn test_summary_metrics() {
        let performance = series(&[0.0, 0.02, -0.01, 0.03]);
        let changes = vec![
            change(d(3), ChangeType::Rebalance),
            change(d(4), ChangeType::NoChange),
            change(d(5), ChangeType::Rebalance),
        ];

        let summary = IndexSummary::compute(&performance, &changes);

        assert_eq!(summary.total_composition_changes, 2);
        assert_eq!(summary.trading_days, 4);
        assert_eq!(summary.best_day.unwrap().date, d(5));
        assert_eq!(summary.worst_day.unwrap().date, d(4));
        assert_relative_eq!(summary.total_return, 1.02 * 0.99 * 1.03 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(summary.average_daily_return, 0.01, epsilon = 1e-12);

        // Sample std of [0, .02, -.01, .03] is sqrt(0.001 / 3).
        let expected_vol = (0.001_f64 / 3.0).sqrt() * 252.0_f64.sqrt();
        assert_relative_eq!(summary.annualized_volatility, expected_vol, epsilon = 1e-12);
        assert_relative_eq!(
            summary.sharpe_ratio,
            summary.total_return / expected_vol,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_flat_series_has_zero_sharpe() {
        let summary = IndexSummary::compute(&series(&[0.0, 0.0, 0.0]), &[]);
        assert_eq!(summary.annualized_volatility, 0.0);
        assert_eq!(summary.sharpe_ratio, 0.0);
        assert_eq!(summary.best_day.unwrap().date, d(2));
    }

    #[test]
    fn test_empty_series() {
        let summary = IndexSummary::compute(&[], &[]);
        assert_eq!(summary.trading_days, 0);
        assert!(summary.best_day.is_none());
        assert_eq!(summary.total_return, 0.0);
        assert_eq!(summary.average_daily_return, 0.0);
        assert!(summary.to_ascii_table().contains("no data"));
    }

    #[test]
    fn test_metric_rows() {
        let summary = IndexSummary::compute(&series(&[0.0, 0.05]), &[]);
        let metrics = summary.metrics();

        assert_eq!(metrics.len(), 8);
        assert_eq!(metrics[0].metric, "Total Composition Changes");
        assert_eq!(metrics[1].value, "2024-01-03 (5.00%)");
        assert_eq!(metrics[3].value, "5.00%");
        assert_eq!(metrics[6].value, "2");
    }

    #[test]
    fn test_renderings() {
        let summary = IndexSummary::compute(&series(&[0.0, 0.01, -0.02]), &[]);

        let ascii = summary.to_ascii_table();
        assert!(ascii.contains("Period: 2024-01-02 to 2024-01-04"));
        assert!(ascii.contains("Sharpe Ratio"));

        let markdown = summary.to_markdown();
        assert!(markdown.starts_with("# Equal-Weighted Index Summary"));
        assert!(markdown.contains("| Metric | Value |"));
        assert!(markdown.contains("| Number of Trading Days | 3 |"));

        assert!(summary.to_string().contains("Trading Days: 3"));
    }
}
