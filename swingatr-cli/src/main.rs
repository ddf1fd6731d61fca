//! SwingATR CLI: backtest and scan commands.
//!
//! Commands:
//! - `backtest START END`: simulate the ATR swing strategy over a date range
//! - `scan`: look for trend-line setups across a list of symbols

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use swingatr_core::data::StdoutProgress;
use swingatr_core::pivots::PivotSide;
use swingatr_runner::report::{render_summary, save_artifacts};
use swingatr_runner::{
    build_provider, parse_date, read_symbols, run_backtest, run_scan, RunConfig, ScanConfig,
    SourceKind,
};

#[derive(Parser)]
#[command(
    name = "swingatr",
    about = "SwingATR: ATR swing-trade backtester and trend-line scanner"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate the strategy from START to END (inclusive, YYYY-MM-DD).
    Backtest {
        start: String,
        end: String,

        /// TOML config file. Every section is optional.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbol to trade (overrides the config).
        #[arg(long)]
        symbol: Option<String>,

        /// Read prices from <DIR>/<SYMBOL>.csv instead of downloading.
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Fall back to synthetic data when prices cannot be loaded.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Directory for the summary, transaction CSV and result JSON.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Scan symbols for channel/trend-line setups on the latest bar.
    Scan {
        /// File with one symbol per line.
        #[arg(long)]
        symbols_file: PathBuf,

        /// Scan date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// TOML config file; its [data] section selects the provider.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Read prices from <DIR>/<SYMBOL>.csv instead of downloading.
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Pivot side to draw lines through.
        #[arg(long, value_enum, default_value_t = SideArg::Low)]
        side: SideArg,

        /// Concurrent fetches; defaults to the scan configuration.
        #[arg(long)]
        workers: Option<usize>,

        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Low,
    High,
}

impl From<SideArg> for PivotSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Low => PivotSide::Low,
            SideArg::High => PivotSide::High,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            start,
            end,
            config,
            symbol,
            csv_dir,
            synthetic,
            output_dir,
        } => run_backtest_cmd(start, end, config, symbol, csv_dir, synthetic, output_dir),
        Commands::Scan {
            symbols_file,
            date,
            config,
            csv_dir,
            side,
            workers,
            output_dir,
        } => run_scan_cmd(symbols_file, date, config, csv_dir, side, workers, output_dir),
    }
}

fn load_config(path: Option<&PathBuf>, csv_dir: Option<PathBuf>) -> Result<RunConfig> {
    let mut config = match path {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(dir) = csv_dir {
        config.data.source = SourceKind::Csv;
        config.data.csv_dir = dir;
    }
    Ok(config)
}

fn run_backtest_cmd(
    start: String,
    end: String,
    config_path: Option<PathBuf>,
    symbol: Option<String>,
    csv_dir: Option<PathBuf>,
    synthetic: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path.as_ref(), csv_dir)?;
    config.backtest.start_date = Some(start);
    config.backtest.end_date = Some(end);
    if let Some(symbol) = symbol {
        config.backtest.symbol = symbol;
    }
    if synthetic {
        config.data.synthetic = true;
    }
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    config.validate()?;

    let provider = build_provider(&config).context("failed to set up price provider")?;
    let result = run_backtest(&config, Some(provider.as_ref()))
        .with_context(|| format!("backtest of {} failed", config.backtest.symbol))?;

    print!("{}", render_summary(&result));
    let paths = save_artifacts(&result, &config.output.dir)?;
    println!("Summary written to: {}", paths.summary.display());
    println!("Transactions written to: {}", paths.transactions.display());
    println!("Result written to: {}", paths.result.display());

    Ok(())
}

fn build_scan_config(side: SideArg, workers: Option<usize>) -> ScanConfig {
    let defaults = ScanConfig::default();
    ScanConfig {
        workers: workers.unwrap_or(defaults.workers),
        side: side.into(),
        ..defaults
    }
}

fn run_scan_cmd(
    symbols_file: PathBuf,
    date: Option<String>,
    config_path: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
    side: SideArg,
    workers: Option<usize>,
    output_dir: PathBuf,
) -> Result<()> {
    let config = load_config(config_path.as_ref(), csv_dir)?;
    let as_of: NaiveDate = match date.as_deref() {
        Some(value) => parse_date(value)?,
        None => chrono::Local::now().date_naive(),
    };

    let symbols = read_symbols(&symbols_file)?;
    if symbols.is_empty() {
        bail!("no symbols listed in {}", symbols_file.display());
    }

    let provider = build_provider(&config).context("failed to set up price provider")?;
    let scan_config = build_scan_config(side, workers);
    let report = run_scan(&symbols, provider, as_of, &scan_config, &StdoutProgress)?;

    let (output, listed) = report.write(&output_dir)?;
    println!(
        "{} of {} symbols have a setup",
        report.with_setup().count(),
        report.reports.len()
    );
    println!("Setups written to: {}", output.display());
    println!("Symbols written to: {}", listed.display());

    Ok(())
}
