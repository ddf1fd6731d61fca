//! SwingATR Runner: configuration, data loading, backtests, reports, scans.
//!
//! This crate builds on `swingatr-core` to provide:
//! - TOML run configuration with defaults for every section
//! - Data loading with provider/synthetic fallback and dataset hashing
//! - Single-backtest runner producing a versioned `BacktestResult`
//! - Text, CSV and JSON report artifacts
//! - Concurrent multi-symbol pivot scan

pub mod config;
pub mod data_loader;
pub mod report;
pub mod runner;
pub mod scan;

pub use config::{parse_date, ConfigError, RunConfig, SourceKind};
pub use data_loader::{build_provider, load_series, LoadError, LoadOptions, LoadedSeries};
pub use report::{save_artifacts, ReportPaths};
pub use runner::{backtest_series, run_backtest, BacktestResult, EquityPoint, RunError};
pub use scan::{read_symbols, run_scan, ScanConfig, ScanError, ScanReport};
