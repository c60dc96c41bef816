#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/equiweight/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod changes;
pub mod export;
pub mod report;
pub mod summary;

pub use changes::{
    ChangeType, CompositionChange, DailyComposition, composition_changes, daily_compositions,
};
pub use export::{ExportBundle, ExportError, ExportFormat, Exporter, PerformanceRow};
pub use report::{Report, ReportBuilder, ReportError, RunStats};
pub use summary::{ANNUALIZATION_FACTOR, DayReturn, IndexSummary, SummaryMetric};
