//! Reporting over a stored index run.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use equiweight_index::{IndexConfig, IndexEngine, IndexStore, MemoryStore, PriceIndex, PriceRecord};
use equiweight_output::{
    ChangeType, ExportBundle, ExportFormat, IndexSummary, PerformanceRow, ReportBuilder,
    composition_changes, daily_compositions,
};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// C overtakes B on the 3rd.
fn run_index() -> (MemoryStore, equiweight_index::RunOutcome) {
    let prices = PriceIndex::from_records(vec![
        PriceRecord::new("A", d(2), Some(100.0), 3.0e9),
        PriceRecord::new("B", d(2), Some(50.0), 2.0e9),
        PriceRecord::new("C", d(2), Some(20.0), 1.0e9),
        PriceRecord::new("A", d(3), Some(102.0), 3.1e9),
        PriceRecord::new("B", d(3), Some(49.0), 1.9e9),
        PriceRecord::new("C", d(3), Some(40.0), 5.0e9),
        PriceRecord::new("A", d(4), Some(101.0), 3.0e9),
        PriceRecord::new("B", d(4), Some(48.0), 1.8e9),
        PriceRecord::new("C", d(4), Some(42.0), 5.2e9),
    ]);
    let mut store = MemoryStore::new();
    let engine = IndexEngine::new(IndexConfig::new(2, 100.0)).unwrap();
    let outcome = engine.run(&prices, &mut store, d(1), d(31)).unwrap();
    (store, outcome)
}

#[test]
fn test_changes_and_summary_from_run() {
    let (store, _) = run_index();
    let snapshots = store.compositions_between(d(1), d(31)).unwrap();
    let performance = store.performance_between(d(1), d(31)).unwrap();

    let changes = composition_changes(&snapshots);
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].change_type, ChangeType::Rebalance);
    assert_eq!(changes[0].tickers_added.as_deref(), Some("C"));
    assert_eq!(changes[0].tickers_removed.as_deref(), Some("B"));
    assert_eq!(changes[1].change_type, ChangeType::NoChange);

    let rows = daily_compositions(&snapshots);
    assert_eq!(rows[0].constituents, "A,B");
    assert_eq!(rows[1].constituents, "C,A");

    let summary = IndexSummary::compute(&performance, &changes);
    assert_eq!(summary.trading_days, 3);
    assert_eq!(summary.total_composition_changes, 1);
    assert_eq!(summary.period_start, Some(d(2)));
    assert_eq!(summary.period_end, Some(d(4)));

    // The 3rd uses the 2nd's basket {A, B}: (0.02 - 0.02) / 2.
    // The 4th uses {C, A}: (0.05 - 1/102) / 2.
    let day4 = (42.0 / 40.0 - 1.0 + 101.0 / 102.0 - 1.0) / 2.0;
    assert_relative_eq!(summary.total_return, day4, epsilon = 1e-12);
    assert_relative_eq!(summary.final_index_value.unwrap(), 100.0 * (1.0 + day4), epsilon = 1e-9);
}

#[test]
fn test_bundle_written_to_disk() {
    let (store, outcome) = run_index();
    let snapshots = store.compositions_between(d(1), d(31)).unwrap();
    let performance = store.performance_between(d(1), d(31)).unwrap();
    let changes = composition_changes(&snapshots);

    let bundle = ExportBundle {
        performance: performance.iter().map(PerformanceRow::from).collect(),
        compositions: daily_compositions(&snapshots),
        summary: IndexSummary::compute(&performance, &changes),
        changes,
    };

    let dir = std::env::temp_dir().join(format!("equiweight-export-{}", std::process::id()));
    let written = bundle.write_all(&dir, ExportFormat::Csv).unwrap();
    assert_eq!(written.len(), 4);
    assert!(written[0].ends_with("index_performance.csv"));

    let performance_csv = std::fs::read_to_string(&written[0]).unwrap();
    assert_eq!(performance_csv.lines().count(), 4);
    let compositions_csv = std::fs::read_to_string(&written[1]).unwrap();
    assert!(compositions_csv.contains("2024-01-03,\"C,A\""));

    let report = ReportBuilder::new()
        .config(IndexConfig::new(2, 100.0))
        .outcome(&outcome)
        .summary(bundle.summary.clone())
        .build()
        .unwrap();
    let report_path = dir.join("run_report.json");
    report.write_to_file(&report_path).unwrap();
    assert!(std::fs::read_to_string(&report_path).unwrap().contains("\"computed_days\": 3"));

    std::fs::remove_dir_all(&dir).unwrap();
}
