//! Equiweight CLI binary.
//!
//! Fetches daily prices for the S&P 500 universe, builds the equal-weighted
//! top-N index and exports its performance and composition history.

mod integration;
mod settings;

use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use equiweight::universe::{GicsSector, Sp500Universe, Universe, UniverseSource};
use equiweight_data::{SqliteStore, WikipediaListing};
use equiweight_index::{ChainSeed, IndexEngine, IndexStore, RunOptions, RunOutcome};
use equiweight_output::{
    ExportBundle, ExportFormat, IndexSummary, PerformanceRow, ReportBuilder, composition_changes,
    daily_compositions,
};
use indicatif::{ProgressBar, ProgressStyle};
use integration::data_pipeline::{FetchConfig, Providers, fetch_universe};
use integration::store_manager;
use settings::Settings;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "equiweight")]
#[command(about = "Equal-weighted index of the largest US stocks", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./equiweight.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Output directory for exports and the log file
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Number of index constituents
    #[arg(long, global = true)]
    size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch data, compute the index and export the results
    Run {
        /// Calendar days of history ending today
        #[arg(long)]
        days_back: Option<i64>,

        /// Delete all stored prices and index rows first
        #[arg(long)]
        fresh: bool,
    },

    /// Fetch and store price data only
    Fetch {
        /// Calendar days of history ending today
        #[arg(long)]
        days_back: Option<i64>,
    },

    /// Compute the index over stored prices
    Compute {
        /// First date (defaults to the first stored price date)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date (defaults to the last stored price date)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Continue from the latest stored level before --from
        #[arg(long, conflicts_with = "fresh")]
        resume: bool,

        /// Delete all stored index rows first
        #[arg(long)]
        fresh: bool,
    },

    /// Write export files from stored tables
    Export {
        /// csv, json or pretty-json
        #[arg(long)]
        format: Option<ExportFormat>,
    },

    /// Print summary metrics of the stored index
    Summary {
        /// Output format
        #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
        format: SummaryFormat,
    },

    /// List the symbol universe
    Universe {
        /// Filter by GICS sector
        #[arg(long)]
        sector: Option<String>,

        /// Skip Wikipedia and use the built-in list
        #[arg(long)]
        fallback: bool,

        /// List all sectors
        #[arg(long)]
        list_sectors: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
    Markdown,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.database {
            settings.storage.database_path = Some(path.clone());
        }
        if let Some(dir) = &self.output {
            settings.output.directory = dir.clone();
        }
        if let Some(size) = self.size {
            settings.index.size = size;
        }
        if let Commands::Run {
            days_back: Some(days),
            ..
        }
        | Commands::Fetch {
            days_back: Some(days),
        } = self.command
        {
            settings.data.days_back = days;
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);
    settings.validate()?;

    let _guard = init_logging(&settings.output.directory)?;

    match cli.command {
        Commands::Run { fresh, .. } => run_full_analysis(&settings, fresh).await?,
        Commands::Fetch { .. } => {
            let (start, end) = history_window(settings.data.days_back);
            let store = open_store(&settings)?;
            fetch_and_store(&settings, &store, start, end).await?;
        }
        Commands::Compute {
            from,
            to,
            resume,
            fresh,
        } => {
            let mut store = open_store(&settings)?;
            if fresh {
                store.clear_index()?;
                info!("cleared stored index tables");
            }
            let Some((first, last)) = store.price_date_range()? else {
                return Err("no prices stored, run `equiweight fetch` first".into());
            };
            let outcome = compute_index(
                &settings,
                &mut store,
                from.unwrap_or(first),
                to.unwrap_or(last),
                resume,
            )?;
            write_run_report(&settings, &store, &outcome)?;
        }
        Commands::Export { format } => {
            let store = open_store(&settings)?;
            export_results(&settings, &store, format.unwrap_or(settings.output.format))?;
        }
        Commands::Summary { format } => {
            let store = open_store(&settings)?;
            print_summary(&store, format)?;
        }
        Commands::Universe {
            sector,
            fallback,
            list_sectors,
        } => {
            if list_sectors {
                list_all_sectors();
            } else {
                list_universe(&settings, sector.as_deref(), fallback).await?;
            }
        }
    }

    Ok(())
}

/// Log to stderr and to `equiweight.log` in the output directory.
fn init_logging(dir: &Path) -> CliResult<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, "equiweight.log"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "equiweight=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}

/// `[today - days_back, today]`.
fn history_window(days_back: i64) -> (NaiveDate, NaiveDate) {
    let end = Utc::now().date_naive();
    (end - Duration::days(days_back), end)
}

fn open_store(settings: &Settings) -> CliResult<SqliteStore> {
    Ok(store_manager::open_store(&settings.storage.database_path())?)
}

/// Set on Ctrl-C; the engine stops before the next date.
fn cancel_on_interrupt() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current date");
            handler_flag.store(true, Ordering::Relaxed);
        }
    });
    flag
}

async fn run_full_analysis(settings: &Settings, fresh: bool) -> CliResult<()> {
    let (start, end) = history_window(settings.data.days_back);

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", "EQUAL-WEIGHTED INDEX ANALYSIS");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Analysis Period: {start} to {end}");
    println!("Index Size: {}", settings.index.size);
    println!("Base Value: {:.2}\n", settings.index.base_value);

    let mut store = open_store(settings)?;
    if fresh {
        store.clear_all()?;
        info!("cleared all stored data");
    }
    store_manager::print_store_info(&store, &settings.storage.database_path())?;
    println!();

    fetch_and_store(settings, &store, start, end).await?;

    let outcome = compute_index(settings, &mut store, start, end, false)?;
    if outcome.cancelled {
        println!("Run cancelled, exporting what was computed.");
    }

    export_results(settings, &store, settings.output.format)?;
    if let Some(summary) = write_run_report(settings, &store, &outcome)? {
        println!("{}", summary.to_ascii_table());
    }

    if let Some(last) = outcome.last_performance() {
        info!(
            final_return_pct = last.cumulative_return * 100.0,
            "analysis completed"
        );
    }
    Ok(())
}

async fn load_universe(settings: &Settings, fallback: bool) -> CliResult<Sp500Universe> {
    let universe = if fallback {
        Sp500Universe::fallback()
    } else {
        Sp500Universe::load(&WikipediaListing::new()?).await
    };
    Ok(universe.take(settings.data.max_symbols))
}

/// Fetch the universe and store it; fails when nothing could be fetched.
async fn fetch_and_store(
    settings: &Settings,
    store: &SqliteStore,
    start: NaiveDate,
    end: NaiveDate,
) -> CliResult<usize> {
    let universe = load_universe(settings, false).await?;
    info!(symbols = universe.size(), source = ?universe.source(), "symbols to process");

    let providers = Providers::new()?;
    let config = FetchConfig {
        batch_size: settings.data.batch_size,
        batch_delay: settings.data.batch_delay(),
    };

    let pb = ProgressBar::new(universe.size() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(StdDuration::from_millis(100));

    let report = fetch_universe(&providers, &universe, start, end, &config, Some(&pb)).await;
    pb.finish_with_message(format!(
        "Fetched {} stocks ({} rows, {} failed)",
        report.stocks.len(),
        report.records.len(),
        report.failed.len()
    ));

    if report.is_empty() {
        return Err("no stock data was fetched, analysis cannot proceed".into());
    }
    if let Some((first, last)) = report.date_range() {
        info!(%first, %last, "date range in fetched data");
    }

    store.put_stocks(&report.stocks)?;
    let rows = store.put_prices(&report.records)?;
    let stats = store.get_stats()?;
    info!(
        rows,
        stocks = stats.unique_symbols,
        total_rows = stats.price_rows,
        "stored price data"
    );
    Ok(rows)
}

/// Run the engine over `[from, to]` with stored prices.
fn compute_index(
    settings: &Settings,
    store: &mut SqliteStore,
    from: NaiveDate,
    to: NaiveDate,
    resume: bool,
) -> CliResult<RunOutcome> {
    let seed = if resume {
        store
            .latest_performance_before(from)?
            .map(|p| ChainSeed::from_entry(&p))
            .unwrap_or_default()
    } else {
        ChainSeed::Base
    };
    // The resumed date's closes are needed for the first return.
    let load_from = match seed {
        ChainSeed::Resume { date, .. } => {
            info!(%date, "resuming from stored level");
            date
        }
        ChainSeed::Base => from,
    };

    let prices = store.load_prices(load_from, to)?;
    let engine = IndexEngine::new(settings.index)?;
    let cancel = cancel_on_interrupt();

    let outcome = engine.run_with(
        &prices,
        store,
        from,
        to,
        RunOptions {
            seed,
            cancel: Some(&cancel),
        },
    )?;

    let skipped: Vec<NaiveDate> = outcome.skipped().collect();
    if !skipped.is_empty() {
        warn!(?skipped, "dates without eligible constituents");
    }
    info!(
        computed = outcome.computed().count(),
        skipped = skipped.len(),
        last = ?outcome.last_processed,
        cancelled = outcome.cancelled,
        "index computation finished"
    );
    Ok(outcome)
}

/// Summary over everything stored, `None` when no performance exists.
fn stored_summary(store: &SqliteStore) -> CliResult<Option<IndexSummary>> {
    let Some((start, end)) = store.performance_date_range()? else {
        return Ok(None);
    };
    let performance = store.performance_between(start, end)?;
    let changes = composition_changes(&store.compositions_between(start, end)?);
    Ok(Some(IndexSummary::compute(&performance, &changes)))
}

fn write_run_report(
    settings: &Settings,
    store: &SqliteStore,
    outcome: &RunOutcome,
) -> CliResult<Option<IndexSummary>> {
    let summary = stored_summary(store)?;
    let mut builder = ReportBuilder::new()
        .config(settings.index)
        .outcome(outcome);
    if let Some(summary) = &summary {
        builder = builder.summary(summary.clone());
    }

    std::fs::create_dir_all(&settings.output.directory)?;
    let path = settings.output.directory.join("run_report.json");
    builder.build()?.write_to_file(&path)?;
    info!(path = %path.display(), "wrote run report");
    Ok(summary)
}

fn export_results(settings: &Settings, store: &SqliteStore, format: ExportFormat) -> CliResult<()> {
    let Some((start, end)) = store.performance_date_range()? else {
        return Err("no index performance stored, run `equiweight compute` first".into());
    };
    let performance = store.performance_between(start, end)?;
    let snapshots = store.compositions_between(start, end)?;
    let changes = composition_changes(&snapshots);

    let bundle = ExportBundle {
        performance: performance.iter().map(PerformanceRow::from).collect(),
        compositions: daily_compositions(&snapshots),
        summary: IndexSummary::compute(&performance, &changes),
        changes,
    };

    let written = bundle.write_all(&settings.output.directory, format)?;
    println!("Exported:");
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}

fn print_summary(store: &SqliteStore, format: SummaryFormat) -> CliResult<()> {
    let Some(summary) = stored_summary(store)? else {
        return Err("no index performance stored, run `equiweight compute` first".into());
    };
    match format {
        SummaryFormat::Text => println!("{}", summary.to_ascii_table()),
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        SummaryFormat::Markdown => println!("{}", summary.to_markdown()),
    }
    Ok(())
}

fn list_all_sectors() {
    println!("\nGICS Sectors:");
    println!("{}", "=".repeat(40));
    for sector in GicsSector::ALL {
        println!("  {:>2}  {}", sector.code(), sector);
    }
}

async fn list_universe(settings: &Settings, sector: Option<&str>, fallback: bool) -> CliResult<()> {
    let sector = sector
        .map(|name| {
            GicsSector::from_name(name).ok_or_else(|| format!("unknown GICS sector: {name}"))
        })
        .transpose()?;
    let universe = load_universe(settings, fallback).await?;

    let source = match universe.source() {
        UniverseSource::Wikipedia => "Wikipedia S&P 500 listing",
        UniverseSource::Fallback => "built-in fallback list",
    };
    println!("\nUniverse: {} symbols from the {source}", universe.size());
    println!("{}", "=".repeat(60));
    for constituent in universe
        .constituents()
        .iter()
        .filter(|c| sector.is_none() || c.sector == sector)
    {
        println!(
            "  {:<8} {:<24} {}",
            constituent.symbol,
            constituent.sector.map_or("Unknown", |s| s.name()),
            constituent.name.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compute_arguments() {
        let cli = Cli::try_parse_from([
            "equiweight",
            "compute",
            "--from",
            "2024-01-02",
            "--to",
            "2024-03-28",
            "--resume",
        ])
        .unwrap();

        match cli.command {
            Commands::Compute {
                from,
                to,
                resume,
                fresh,
            } => {
                assert_eq!(from, Some(d(2024, 1, 2)));
                assert_eq!(to, Some(d(2024, 3, 28)));
                assert!(resume);
                assert!(!fresh);
            }
            _ => panic!("expected compute"),
        }
    }

    #[test]
    fn test_fresh_flags() {
        let cli = Cli::try_parse_from(["equiweight", "run", "--fresh"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { fresh: true, .. }));

        let cli = Cli::try_parse_from(["equiweight", "compute", "--fresh"]).unwrap();
        assert!(matches!(cli.command, Commands::Compute { fresh: true, .. }));

        assert!(Cli::try_parse_from(["equiweight", "compute", "--fresh", "--resume"]).is_err());
    }

    #[rstest]
    #[case(&["equiweight", "summary"], SummaryFormat::Text)]
    #[case(&["equiweight", "summary", "--format", "json"], SummaryFormat::Json)]
    #[case(&["equiweight", "summary", "--format", "markdown"], SummaryFormat::Markdown)]
    fn test_summary_format(#[case] args: &[&str], #[case] expected: SummaryFormat) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Commands::Summary { format } if format == expected));
    }

    #[test]
    fn test_export_format_argument() {
        let cli = Cli::try_parse_from(["equiweight", "export", "--format", "pretty-json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export {
                format: Some(ExportFormat::PrettyJson)
            }
        ));
        assert!(Cli::try_parse_from(["equiweight", "export", "--format", "xlsx"]).is_err());
    }

    #[test]
    fn test_overrides_apply_to_settings() {
        let cli = Cli::try_parse_from([
            "equiweight",
            "run",
            "--days-back",
            "90",
            "--size",
            "25",
            "--database",
            "/tmp/test.db",
            "--output",
            "/tmp/out",
        ])
        .unwrap();

        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.data.days_back, 90);
        assert_eq!(settings.index.size, 25);
        assert_eq!(settings.storage.database_path(), PathBuf::from("/tmp/test.db"));
        assert_eq!(settings.output.directory, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_history_window() {
        let (start, end) = history_window(30);
        assert_eq!(end - start, Duration::days(30));
    }

    #[test]
    fn test_compute_and_export_over_store() {
        use equiweight_index::PriceRecord;

        let dir = std::env::temp_dir().join(format!("equiweight-cli-{}", process::id()));
        let mut settings = Settings::default();
        settings.index.size = 2;
        settings.output.directory = dir.clone();

        let mut store = SqliteStore::in_memory().unwrap();
        store
            .put_prices(&[
                PriceRecord::new("A", d(2024, 1, 2), Some(100.0), 1.0e9),
                PriceRecord::new("B", d(2024, 1, 2), Some(90.0), 0.9e9),
                PriceRecord::new("A", d(2024, 1, 3), Some(110.0), 1.1e9),
                PriceRecord::new("B", d(2024, 1, 3), Some(90.0), 0.9e9),
            ])
            .unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let outcome = runtime
            .block_on(async {
                compute_index(&settings, &mut store, d(2024, 1, 1), d(2024, 1, 31), false)
            })
            .unwrap();
        assert_eq!(outcome.last_processed, Some(d(2024, 1, 3)));

        let summary = write_run_report(&settings, &store, &outcome).unwrap().unwrap();
        assert_eq!(summary.trading_days, 2);
        assert!((summary.total_return - 0.05).abs() < 1e-12);

        export_results(&settings, &store, ExportFormat::Csv).unwrap();
        assert!(dir.join("index_performance.csv").exists());
        assert!(dir.join("run_report.json").exists());

        store.clear_index().unwrap();
        assert!(stored_summary(&store).unwrap().is_none());
        assert!(export_results(&settings, &store, ExportFormat::Csv).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
