//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price sources (HTTP CSV download,
//! local CSV files) so the runner can swap implementations and mock for tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw daily OHLCV bar from a data provider (before ATR annotation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_close: f64,
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("HTTP {status} fetching {symbol}")]
    HttpStatus { symbol: String, status: u16 },

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("malformed price data: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("giving up on {symbol} after {attempts} attempts: {last}")]
    RetriesExhausted {
        symbol: String,
        attempts: u32,
        #[source]
        last: Box<DataError>,
    },
}

impl DataError {
    /// Transient failures worth another attempt. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::Network(_) | DataError::RateLimited { .. } => true,
            DataError::HttpStatus { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }
}

/// Result of a successful data fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Http,
    CsvFile,
    Synthetic,
}

/// Trait for price data providers.
///
/// Implementations return bars in chronological order, restricted to the
/// requested range. A fetch either returns the complete series or an error.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a symbol over a date range (inclusive).
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// Check if the provider can currently serve requests.
    fn is_available(&self) -> bool;
}

/// Progress callback for multi-symbol operations.
pub trait FetchProgress: Send + Sync {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol completes, successfully or not.
    fn on_complete(&self, symbol: &str, result: &Result<(), DataError>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, result: &Result<(), DataError>) {
        match result {
            Ok(()) => println!("  OK: {symbol}"),
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nScan complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Keep bars dated within `start..=end`.
pub fn restrict_to_range(bars: Vec<RawBar>, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
    bars.into_iter()
        .filter(|b| b.date >= start && b.date <= end)
        .collect()
}
