//! Bar loading for the runner.
//!
//! Resolves one symbol's history into an ATR-annotated series. Fallback policy:
//! 1. Fetch from the configured provider (with its bounded retry)
//! 2. If that fails and synthetic data is enabled, generate bars (tagged)
//! 3. Otherwise fail with the provider's error
//!
//! Synthetic data is a developer-only mode. Results produced on it carry
//! `is_synthetic` all the way into the report.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{info, warn};

use swingatr_core::data::{
    CsvFileProvider, DataError, DataProvider, DataSource, HttpCsvProvider, RawBar,
};
use swingatr_core::domain::BarSeries;

use crate::config::{RunConfig, SourceKind};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load '{symbol}' (enable synthetic data to run without it): {source}")]
    FetchFailed {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("provider '{provider}' is unavailable for '{symbol}'")]
    ProviderUnavailable { symbol: String, provider: String },

    #[error("failed to set up provider: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// First date fetched, usually well before the simulation start.
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub atr_window: usize,
    /// Generate bars when the provider cannot serve the symbol.
    pub synthetic: bool,
}

#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: BarSeries,
    pub source: DataSource,
    /// BLAKE3 over the symbol and every raw bar field.
    pub dataset_hash: String,
    pub is_synthetic: bool,
}

/// Build the provider named by the `[data]` section.
pub fn build_provider(config: &RunConfig) -> Result<Arc<dyn DataProvider>, LoadError> {
    let provider: Arc<dyn DataProvider> = match config.data.source {
        SourceKind::Http => Arc::new(HttpCsvProvider::new(
            config.data.url_template.clone(),
            config.retry_policy(),
        )?),
        SourceKind::Csv => Arc::new(CsvFileProvider::new(config.data.csv_dir.clone())),
    };
    Ok(provider)
}

/// Load one symbol's bars and annotate them with the ATR.
pub fn load_series(
    symbol: &str,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    let failure = match provider {
        Some(p) if p.is_available() => match p.fetch(symbol, opts.start, opts.end) {
            Ok(fetched) => {
                info!(
                    symbol,
                    provider = p.name(),
                    bars = fetched.bars.len(),
                    "loaded price history"
                );
                return Ok(finish(symbol, fetched.bars, fetched.source, opts));
            }
            Err(source) => LoadError::FetchFailed {
                symbol: symbol.to_string(),
                source,
            },
        },
        Some(p) => LoadError::ProviderUnavailable {
            symbol: symbol.to_string(),
            provider: p.name().to_string(),
        },
        None => LoadError::ProviderUnavailable {
            symbol: symbol.to_string(),
            provider: "none".to_string(),
        },
    };

    if !opts.synthetic {
        return Err(failure);
    }
    warn!(symbol, error = %failure, "generating synthetic data; results will be tagged");
    let bars = generate_synthetic_bars(symbol, opts.start, opts.end);
    Ok(finish(symbol, bars, DataSource::Synthetic, opts))
}

fn finish(symbol: &str, bars: Vec<RawBar>, source: DataSource, opts: &LoadOptions) -> LoadedSeries {
    let dataset_hash = compute_dataset_hash(symbol, &bars);
    LoadedSeries {
        series: BarSeries::from_raw(symbol, bars, opts.atr_window),
        source,
        dataset_hash,
        is_synthetic: source == DataSource::Synthetic,
    }
}

/// Deterministic BLAKE3 hash over a symbol's bar data.
pub fn compute_dataset_hash(symbol: &str, bars: &[RawBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
        hasher.update(&bar.adj_close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Weekday random walk seeded from the symbol name.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(RawBar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
            adj_close: close,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
