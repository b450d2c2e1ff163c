//! Statarb CLI: download, screen, run, and cache management commands.
//!
//! Commands:
//! - `download`: fetch daily closes from Yahoo Finance into the Parquet cache
//! - `screen`: rank cointegrated pairs over a universe
//! - `run`: screen, then signal and backtest the top pairs and save artifacts
//! - `cache status`: report cached symbols, date ranges and sizes

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use statarb_core::data::{
    download_symbols, DataProvider, PriceCache, StdoutProgress, YahooProvider,
};
use statarb_core::CointegrationAnalyzer;
use statarb_runner::config::DataConfig;
use statarb_runner::report::{format_pair_table, format_report, format_skipped};
use statarb_runner::{load_from_config, run_from_config, save_artifacts, RunConfig};

#[derive(Parser)]
#[command(
    name = "statarb",
    about = "Pairs-trading statistical arbitrage on NIFTY 50 stocks"
)]
struct Cli {
    /// Log filter (e.g. info, debug, statarb_core=trace). RUST_LOG applies when unset.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily closes from Yahoo Finance and cache as Parquet.
    Download {
        /// Symbols to download (e.g. TCS.NS INFY.NS). Defaults to the universe.
        symbols: Vec<String>,

        /// Universe TOML file. Defaults to the NIFTY 50.
        #[arg(long)]
        universe: Option<PathBuf>,

        #[command(flatten)]
        range: RangeArgs,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,
    },
    /// Rank cointegrated pairs.
    Screen {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        screen: ScreenArgs,
    },
    /// Screen, backtest the top pairs, print the report and save artifacts.
    Run {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        screen: ScreenArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, date ranges, and sizes.
    Status {
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,
    },
}

#[derive(Args)]
struct RangeArgs {
    /// Start date (YYYY-MM-DD). Overrides --period.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// History length ending at the end date: 30d, 6mo, 2y.
    #[arg(long)]
    period: Option<String>,
}

#[derive(Args)]
struct DataArgs {
    /// Run config TOML. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbols to screen. Defaults to the universe.
    #[arg(long, num_args = 1..)]
    symbols: Vec<String>,

    /// Universe TOML file.
    #[arg(long)]
    universe: Option<PathBuf>,

    #[command(flatten)]
    range: RangeArgs,

    /// No network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic prices as fallback.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Re-download even if cached.
    #[arg(long, default_value_t = false)]
    force: bool,

    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ScreenArgs {
    /// Maximum p-value for a pair to count as cointegrated.
    #[arg(long)]
    significance: Option<f64>,

    /// Number of top pairs to report and backtest.
    #[arg(long)]
    top_pairs: Option<usize>,

    /// Screen pairs on a single thread.
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

#[derive(Args)]
struct StrategyArgs {
    #[arg(long)]
    entry_threshold: Option<f64>,

    #[arg(long)]
    exit_threshold: Option<f64>,

    #[arg(long)]
    stop_loss: Option<f64>,

    /// Rolling window for the spread z-score.
    #[arg(long)]
    lookback: Option<usize>,

    #[arg(long)]
    initial_capital: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Download {
            symbols,
            universe,
            range,
            force,
            cache_dir,
        } => run_download(symbols, universe, range, force, cache_dir),
        Commands::Screen { data, screen } => run_screen(data, screen),
        Commands::Run {
            data,
            screen,
            strategy,
            output_dir,
        } => run_pipeline_cmd(data, screen, strategy, output_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn apply_range(data: &mut DataConfig, range: RangeArgs) {
    if let Some(start) = range.start {
        data.start = Some(start);
    }
    if let Some(end) = range.end {
        data.end = Some(end);
    }
    if let Some(period) = range.period {
        data.period = period;
    }
}

/// File config (or defaults) with command-line overrides applied.
fn build_config(
    data: DataArgs,
    screen: ScreenArgs,
    strategy: Option<StrategyArgs>,
) -> Result<RunConfig> {
    let mut config = match &data.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };

    if !data.symbols.is_empty() {
        config.data.symbols = data.symbols;
    }
    if data.universe.is_some() {
        config.data.universe = data.universe;
    }
    apply_range(&mut config.data, data.range);
    config.data.offline |= data.offline;
    config.data.synthetic |= data.synthetic;
    config.data.force |= data.force;
    if let Some(dir) = data.cache_dir {
        config.data.cache_dir = dir;
    }

    if let Some(sig) = screen.significance {
        config.screen.significance_level = sig;
    }
    if let Some(n) = screen.top_pairs {
        config.screen.top_pairs = n;
    }
    if screen.sequential {
        config.screen.parallel = false;
    }

    if let Some(s) = strategy {
        if let Some(v) = s.entry_threshold {
            config.strategy.entry_threshold = v;
        }
        if let Some(v) = s.exit_threshold {
            config.strategy.exit_threshold = v;
        }
        if let Some(v) = s.stop_loss {
            config.strategy.stop_loss = v;
        }
        if let Some(v) = s.lookback {
            config.strategy.lookback = v;
        }
        if let Some(v) = s.initial_capital {
            config.backtest.initial_capital = v;
        }
    }

    config.validate()?;
    Ok(config)
}

fn make_provider(offline: bool) -> Result<Option<YahooProvider>> {
    if offline {
        return Ok(None);
    }
    Ok(Some(
        YahooProvider::new().context("failed to build Yahoo provider")?,
    ))
}

fn run_download(
    symbols: Vec<String>,
    universe: Option<PathBuf>,
    range: RangeArgs,
    force: bool,
    cache_dir: PathBuf,
) -> Result<()> {
    let mut data = DataConfig {
        symbols,
        universe,
        ..DataConfig::default()
    };
    apply_range(&mut data, range);
    let (start, end) = data.date_range(today())?;
    let symbols = data.resolve_symbols()?;

    let provider = YahooProvider::new().context("failed to build Yahoo provider")?;
    let cache = PriceCache::new(cache_dir);
    let sym_refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    info!(symbols = sym_refs.len(), %start, %end, "Downloading");

    let summary = download_symbols(
        &provider,
        &cache,
        &sym_refs,
        start,
        end,
        force,
        &StdoutProgress,
    );

    if summary.skipped > 0 {
        println!("{} symbol(s) already cached", summary.skipped);
    }
    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_screen(data: DataArgs, screen: ScreenArgs) -> Result<()> {
    let config = build_config(data, screen, None)?;
    let cache = PriceCache::new(&config.data.cache_dir);
    let provider = make_provider(config.data.offline)?;
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    let loaded = load_from_config(&config, &cache, provider_ref, Some(&StdoutProgress), today())?;
    let analyzer = CointegrationAnalyzer::new(config.analyzer_config());
    let report = analyzer.screen(&loaded.matrix);

    println!();
    println!(
        "Data: {} instruments, {} to {}",
        loaded.matrix.instrument_count(),
        loaded.matrix.first_date(),
        loaded.matrix.last_date()
    );
    if loaded.has_synthetic {
        println!("WARNING: results include SYNTHETIC prices");
    }
    println!(
        "Screened {} pairs: {} cointegrated at {}",
        report.tested,
        report.candidates.len(),
        report.significance_level
    );
    println!();
    print!("{}", format_pair_table(report.top(config.screen.top_pairs)));
    if !report.skipped.is_empty() {
        println!("Skipped {} pair(s):", report.skipped.len());
        print!("{}", format_skipped(&report.skipped));
    }

    Ok(())
}

fn run_pipeline_cmd(
    data: DataArgs,
    screen: ScreenArgs,
    strategy: StrategyArgs,
    output_dir: PathBuf,
) -> Result<()> {
    let config = build_config(data, screen, Some(strategy))?;
    let cache = PriceCache::new(&config.data.cache_dir);
    let provider = make_provider(config.data.offline)?;
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    let report = run_from_config(&config, &cache, provider_ref, Some(&StdoutProgress), today())?;

    println!();
    print!("{}", format_report(&report));

    let run_dir = save_artifacts(&report, &output_dir)?;
    println!();
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = PriceCache::new(cache_dir);
    let symbols = cache.cached_symbols();
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let mut total_size: u64 = 0;
    let mut rows: Vec<(String, String, String, u64)> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let (range, points) = match cache.get_meta(&symbol) {
            Some(meta) => (
                format!("{} to {}", meta.start_date, meta.end_date),
                format!("{} days ({})", meta.point_count, meta.source),
            ),
            None => ("(no meta)".into(), String::new()),
        };
        let size = dir_size(&cache_dir.join(format!("symbol={symbol}")));
        total_size += size;
        rows.push((symbol, range, points, size));
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", rows.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<16} {:<26} {:<22} {:>10}",
        "Symbol", "Date Range", "Points", "Size"
    );
    println!("{}", "-".repeat(77));
    for (sym, range, points, size) in &rows {
        println!(
            "{:<16} {:<26} {:<22} {:>10}",
            sym,
            range,
            points,
            format_size(*size)
        );
    }

    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    std::fs::read_dir(path)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "statarb",
            "run",
            "--symbols",
            "TCS.NS",
            "INFY.NS",
            "--start",
            "2022-01-03",
            "--end",
            "2023-12-29",
            "--offline",
            "--top-pairs",
            "2",
            "--entry-threshold",
            "1.5",
            "--lookback",
            "40",
        ]);
        let Commands::Run {
            data,
            screen,
            strategy,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        let config = build_config(data, screen, Some(strategy)).unwrap();
        assert_eq!(config.data.symbols, vec!["TCS.NS", "INFY.NS"]);
        assert_eq!(config.data.start, NaiveDate::from_ymd_opt(2022, 1, 3));
        assert!(config.data.offline);
        assert_eq!(config.screen.top_pairs, 2);
        assert_eq!(config.strategy.entry_threshold, 1.5);
        assert_eq!(config.strategy.lookback, 40);
        assert_eq!(config.strategy.stop_loss, RunConfig::default().strategy.stop_loss);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = Cli::parse_from(["statarb", "screen", "--significance", "1.5"]);
        let Commands::Screen { data, screen } = cli.command else {
            panic!("expected screen");
        };
        assert!(build_config(data, screen, None).is_err());
    }
}
