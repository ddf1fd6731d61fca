//! Backtest runner: wires configuration, data loading and the simulation.
//!
//! Two entry points:
//! - `run_backtest()`: validates the config, loads the series, runs. Used by the CLI.
//! - `backtest_series()`: runs on an already-loaded series, no I/O.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use swingatr_core::data::{DataProvider, DataSource};
use swingatr_core::domain::{BarSeries, Position, Transaction};
use swingatr_core::engine::{run_simulation, SimulationError, SimulationOutcome};
use swingatr_core::strategy::{AllocationBand, StrategyParams};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_series, LoadError, LoadOptions, LoadedSeries};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// End-of-day portfolio value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub value: f64,
    pub band: AllocationBand,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub params: StrategyParams,
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub final_position: Option<Position>,
    pub closed_positions: Vec<Position>,
    pub transactions: Vec<Transaction>,
    pub equity_curve: Vec<EquityPoint>,
    pub bar_count: usize,
    pub void_bars_skipped: usize,
    pub dataset_hash: String,
    pub source: DataSource,
    pub is_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    fn from_outcome(
        outcome: SimulationOutcome,
        params: &StrategyParams,
        bar_count: usize,
        loaded: &LoadedSeries,
    ) -> Self {
        let max_drawdown = outcome.max_drawdown();
        let equity_curve = outcome
            .days
            .iter()
            .map(|d| EquityPoint {
                date: d.date,
                close: d.close,
                value: d.portfolio_value,
                band: d.band,
            })
            .collect();
        let portfolio = outcome.portfolio;
        Self {
            schema_version: SCHEMA_VERSION,
            symbol: portfolio.symbol.clone(),
            start_date: portfolio.start_date,
            end_date: portfolio.end_date,
            params: params.clone(),
            initial_value: portfolio.initial_value,
            final_value: portfolio.current_value,
            total_return: portfolio.total_return(),
            max_drawdown,
            final_position: portfolio.current_position().cloned(),
            closed_positions: portfolio.closed_positions,
            transactions: portfolio.transactions,
            equity_curve,
            bar_count,
            void_bars_skipped: outcome.void_bars_skipped,
            dataset_hash: loaded.dataset_hash.clone(),
            source: loaded.source,
            is_synthetic: loaded.is_synthetic,
        }
    }
}

/// Run a single backtest from a config, fetching data through `provider`.
pub fn run_backtest(
    config: &RunConfig,
    provider: Option<&dyn DataProvider>,
) -> Result<BacktestResult, RunError> {
    let (start, end) = config.validate()?;
    let symbol = config.backtest.symbol.trim().to_uppercase();
    let opts = LoadOptions {
        start: config.history_start(start),
        end,
        atr_window: config.strategy.atr_window,
        synthetic: config.data.synthetic,
    };
    let loaded = load_series(&symbol, provider, &opts)?;
    backtest_series(&loaded, &config.strategy, start, end)
}

/// Run on pre-loaded data. No I/O.
pub fn backtest_series(
    loaded: &LoadedSeries,
    params: &StrategyParams,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BacktestResult, RunError> {
    let series: &BarSeries = &loaded.series;
    let outcome = run_simulation(series, params, start, end)?;
    let result = BacktestResult::from_outcome(outcome, params, series.len(), loaded);
    info!(
        symbol = %result.symbol,
        start = %result.start_date,
        end = %result.end_date,
        final_value = result.final_value,
        total_return = result.total_return,
        transactions = result.transactions.len(),
        synthetic = result.is_synthetic,
        "backtest complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::{compute_dataset_hash, generate_synthetic_bars};
    use swingatr_core::data::CsvFileProvider;
    use swingatr_core::domain::TransactionKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn synthetic_loaded(symbol: &str, window: usize) -> LoadedSeries {
        let raw = generate_synthetic_bars(symbol, date(2022, 1, 3), date(2023, 12, 29));
        LoadedSeries {
            dataset_hash: compute_dataset_hash(symbol, &raw),
            series: BarSeries::from_raw(symbol, raw, window),
            source: DataSource::Synthetic,
            is_synthetic: true,
        }
    }

    fn config(start: &str, end: &str) -> RunConfig {
        let mut config = RunConfig::default();
        config.backtest.symbol = "spy".into();
        config.backtest.start_date = Some(start.into());
        config.backtest.end_date = Some(end.into());
        config.backtest.history_years = 1;
        config.strategy.atr_window = 10;
        config
    }

    #[test]
    fn result_summarises_the_run() {
        let loaded = synthetic_loaded("SPY", 10);
        let params = StrategyParams {
            atr_window: 10,
            ..StrategyParams::default()
        };
        let result = backtest_series(&loaded, &params, date(2023, 1, 3), date(2023, 12, 29)).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.symbol, "SPY");
        assert_eq!(result.initial_value, params.initial_capital);
        assert_eq!(
            result.final_value,
            result.equity_curve.last().unwrap().value
        );
        assert!((result.total_return - (result.final_value / result.initial_value - 1.0)).abs() < 1e-12);
        assert_eq!(result.transactions[0].kind, TransactionKind::Entry);
        assert!(result.final_position.is_some());
        assert!(result.max_drawdown >= 0.0 && result.max_drawdown < 1.0);
        assert!(result.is_synthetic);
        assert_eq!(result.bar_count, loaded.series.len());
    }

    #[test]
    fn run_backtest_through_csv_provider() {
        let dir = tempfile::tempdir().unwrap();
        let raw = generate_synthetic_bars("SPY", date(2022, 1, 3), date(2023, 12, 29));
        let file = std::fs::File::create(dir.path().join("SPY.csv")).unwrap();
        swingatr_core::data::write_price_csv(file, &raw).unwrap();
        let provider = CsvFileProvider::new(dir.path());

        let result = run_backtest(&config("2023-01-03", "2023-06-30"), Some(&provider)).unwrap();
        assert_eq!(result.symbol, "SPY");
        assert_eq!(result.source, DataSource::CsvFile);
        assert!(!result.is_synthetic);
        assert_eq!(result.dataset_hash, compute_dataset_hash("SPY", &raw));
        assert_eq!(result.end_date, date(2023, 6, 30));
    }

    #[test]
    fn invalid_config_fails_before_loading() {
        let err = run_backtest(&config("2023-06-30", "2023-01-03"), None).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::StartAfterEnd { .. })));
    }

    #[test]
    fn missing_data_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvFileProvider::new(dir.path());
        let err = run_backtest(&config("2023-01-03", "2023-06-30"), Some(&provider)).unwrap_err();
        assert!(matches!(err, RunError::Data(LoadError::FetchFailed { .. })));
    }

    #[test]
    fn start_inside_warmup_is_a_simulation_error() {
        let loaded = synthetic_loaded("SPY", 10);
        let params = StrategyParams {
            atr_window: 10,
            ..StrategyParams::default()
        };
        let err = backtest_series(&loaded, &params, date(2022, 1, 4), date(2022, 6, 30)).unwrap_err();
        assert!(matches!(
            err,
            RunError::Simulation(SimulationError::InsufficientHistory { .. })
        ));
    }
}
