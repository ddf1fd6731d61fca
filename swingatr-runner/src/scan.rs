//! Multi-symbol pivot scan.
//!
//! Symbols are fetched and analysed on a bounded rayon pool. Workers send
//! their results through a bounded channel that the calling thread drains,
//! so results arrive in completion order and a slow consumer applies
//! backpressure to the workers. Failed symbols are reported and skipped.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use swingatr_core::data::{DataError, DataProvider, FetchProgress};
use swingatr_core::domain::Bar;
use swingatr_core::pivots::{analyze, PivotAnalysis, PivotConfig, PivotSide};

/// Date format used in scan output file names.
pub const FILE_DATE_FORMAT: &str = "%m-%d-%Y";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read symbols file {path}: {source}")]
    SymbolsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no symbols to scan")]
    NoSymbols,

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub workers: usize,
    /// Calendar days of history fetched per symbol.
    pub lookback_days: i64,
    pub side: PivotSide,
    pub pivots: PivotConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            lookback_days: 365,
            side: PivotSide::Low,
            pivots: PivotConfig::default(),
        }
    }
}

/// One line per symbol; blank lines and `#` comments are ignored.
pub fn parse_symbols(text: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for line in text.lines() {
        let symbol = line.split('#').next().unwrap_or("").trim();
        if symbol.is_empty() {
            continue;
        }
        let symbol = symbol.to_uppercase();
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

pub fn read_symbols(path: &Path) -> Result<Vec<String>, ScanError> {
    let text = std::fs::read_to_string(path).map_err(|source| ScanError::SymbolsFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_symbols(&text))
}

#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub analysis: PivotAnalysis,
    /// Rendered setup block; empty when the symbol has no setup.
    pub rendered: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub as_of: NaiveDate,
    /// Successful symbols in completion order.
    pub reports: Vec<SymbolReport>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn with_setup(&self) -> impl Iterator<Item = &SymbolReport> {
        self.reports.iter().filter(|r| r.analysis.setup.is_some())
    }

    /// Concatenated setup blocks of every symbol with a setup.
    pub fn render_output(&self) -> String {
        self.with_setup().map(|r| r.rendered.as_str()).collect()
    }

    pub fn render_symbols(&self) -> String {
        self.with_setup()
            .map(|r| format!("{}\n", r.analysis.symbol))
            .collect()
    }

    /// Write `<date>_output.txt` and `<date>_symbols.txt` into `dir`.
    pub fn write(&self, dir: &Path) -> Result<(PathBuf, PathBuf), ScanError> {
        std::fs::create_dir_all(dir).map_err(|source| ScanError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        let stamp = self.as_of.format(FILE_DATE_FORMAT);
        let output = dir.join(format!("{stamp}_output.txt"));
        let symbols = dir.join(format!("{stamp}_symbols.txt"));
        for (path, contents) in [
            (&output, self.render_output()),
            (&symbols, self.render_symbols()),
        ] {
            std::fs::write(path, contents).map_err(|source| ScanError::Write {
                path: path.clone(),
                source,
            })?;
        }
        Ok((output, symbols))
    }
}

fn scan_symbol(
    provider: &dyn DataProvider,
    symbol: &str,
    start: NaiveDate,
    as_of: NaiveDate,
    config: &ScanConfig,
) -> Result<SymbolReport, DataError> {
    let fetched = provider.fetch(symbol, start, as_of)?;
    let bars: Vec<Bar> = fetched.bars.into_iter().map(Bar::from).collect();
    let analysis = analyze(symbol, &bars, config.side, &config.pivots);
    let rendered = analysis.render(&bars);
    Ok(SymbolReport { analysis, rendered })
}

/// Fetch and analyse every symbol concurrently.
pub fn run_scan(
    symbols: &[String],
    provider: Arc<dyn DataProvider>,
    as_of: NaiveDate,
    config: &ScanConfig,
    progress: &dyn FetchProgress,
) -> Result<ScanReport, ScanError> {
    if symbols.is_empty() {
        return Err(ScanError::NoSymbols);
    }
    let workers = config.workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("scan-{i}"))
        .build()?;
    let (tx, rx) = mpsc::sync_channel(workers);
    let start = as_of - chrono::Duration::days(config.lookback_days.max(1));
    let total = symbols.len();

    for (index, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, index, total);
        let tx = tx.clone();
        let provider = Arc::clone(&provider);
        let symbol = symbol.clone();
        let config = config.clone();
        pool.spawn(move || {
            let result = scan_symbol(provider.as_ref(), &symbol, start, as_of, &config);
            // the receiver only hangs up once every sender is gone
            let _ = tx.send((symbol, result));
        });
    }
    drop(tx);

    let mut reports = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (symbol, result) in rx {
        match result {
            Ok(report) => {
                debug!(symbol = %symbol, setup = report.analysis.setup.is_some(), "analysed");
                progress.on_complete(&symbol, &Ok(()));
                reports.push(report);
            }
            Err(e) => {
                let error = e.to_string();
                warn!(symbol = %symbol, error = %error, "skipping symbol");
                progress.on_complete(&symbol, &Err(e));
                failures.push(ScanFailure { symbol, error });
            }
        }
    }
    progress.on_batch_complete(reports.len(), failures.len(), total);

    Ok(ScanReport {
        as_of,
        reports,
        failures,
    })
}
