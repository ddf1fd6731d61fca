//! End-to-end simulation tests through the public API.
//!
//! Prices come from the CSV wire format, through the local file provider,
//! into an ATR-annotated series and a full simulated run.

use chrono::NaiveDate;
use std::io::Write;

use swingatr_core::data::{CsvFileProvider, DataProvider, RawBar};
use swingatr_core::domain::{
    Allocation, BarSeries, Extreme, ExtremeKind, Position, PositionSide, TransactionKind,
};
use swingatr_core::engine::{run_simulation, SimulationError};
use swingatr_core::strategy::{classify, target_allocation, AllocationBand, StrategyParams};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A rally to 130, a slide to 110 and a recovery, on a 4-bar ATR window.
fn closes() -> Vec<f64> {
    let mut c: Vec<f64> = (0..10).map(|i| 100.0 + i as f64 * 0.5).collect();
    c.extend((1..=20).map(|i| 104.5 + i as f64 * 1.3));
    c.extend((1..=20).map(|i| 130.5 - i as f64 * 1.0));
    c.extend((1..=15).map(|i| 110.5 + i as f64 * 0.8));
    c
}

fn raw_bars() -> Vec<RawBar> {
    let start = date(2023, 1, 2);
    let closes = closes();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            RawBar {
                date: start + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 10_000,
                adj_close: close,
            }
        })
        .collect()
}

fn write_csv(dir: &std::path::Path, symbol: &str, bars: &[RawBar]) {
    let mut f = std::fs::File::create(dir.join(format!("{symbol}.csv"))).unwrap();
    writeln!(f, "Date,Open,High,Low,Close,Volume,Adj Close").unwrap();
    for b in bars {
        writeln!(
            f,
            "{},{},{},{},{},{},{}",
            b.date, b.open, b.high, b.low, b.close, b.volume, b.adj_close
        )
        .unwrap();
    }
}

fn params() -> StrategyParams {
    StrategyParams {
        atr_window: 4,
        ..StrategyParams::default()
    }
}

#[test]
fn csv_file_to_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let raw = raw_bars();
    write_csv(dir.path(), "TQQ", &raw);

    let provider = CsvFileProvider::new(dir.path());
    let fetched = provider
        .fetch("TQQ", raw[0].date, raw[raw.len() - 1].date)
        .unwrap();
    assert_eq!(fetched.bars.len(), raw.len());

    let series = BarSeries::from_raw("TQQ", fetched.bars, 4);
    let start = series.bars[8].date;
    let end = series.bars[series.len() - 1].date;
    let outcome = run_simulation(&series, &params(), start, end).unwrap();
    let portfolio = &outcome.portfolio;

    assert!(portfolio.is_finished());
    assert_eq!(portfolio.transactions[0].kind, TransactionKind::Entry);
    assert_eq!(outcome.days.len(), series.len() - 8);
    // the slide from 130 to 110 has to flip the extreme and the side at least once
    assert!(portfolio
        .transactions
        .iter()
        .any(|t| t.kind == TransactionKind::Flip));
    assert!(!portfolio.closed_positions.is_empty());

    let net: f64 = outcome.days.iter().map(|d| d.net_change).sum();
    assert!((portfolio.initial_value + net - portfolio.current_value).abs() < 1e-6);
}

#[test]
fn transactions_record_every_allocation_change() {
    let series = BarSeries::from_raw("TQQ", raw_bars(), 4);
    let start = series.bars[8].date;
    let end = series.bars[series.len() - 1].date;
    let outcome = run_simulation(&series, &params(), start, end).unwrap();

    let txs = &outcome.portfolio.transactions;
    for pair in txs.windows(2) {
        assert_eq!(pair[1].from, Some(pair[0].to), "broken chain at {}", pair[1].date);
        assert!(pair[0].date < pair[1].date);
    }
    let changed_days = outcome.days.iter().filter(|d| d.transaction.is_some()).count();
    assert_eq!(changed_days, txs.len());
}

#[test]
fn replay_is_bit_identical() {
    let series = BarSeries::from_raw("TQQ", raw_bars(), 4);
    let start = series.bars[8].date;
    let end = series.bars[40].date;
    let a = run_simulation(&series, &params(), start, end).unwrap();
    let b = run_simulation(&series, &params(), start, end).unwrap();
    assert_eq!(
        a.portfolio.current_value.to_bits(),
        b.portfolio.current_value.to_bits()
    );
    assert_eq!(a, b);
}

#[test]
fn start_before_atr_window_fills_is_rejected() {
    let series = BarSeries::from_raw("TQQ", raw_bars(), 4);
    // first ATR is on bar 5
    let err = run_simulation(
        &series,
        &params(),
        series.bars[4].date,
        series.bars[20].date,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::InsufficientHistory {
            bars_available: 5,
            ..
        }
    ));
    assert!(run_simulation(&series, &params(), series.bars[5].date, series.bars[20].date).is_ok());
}

#[test]
fn long_mark_to_market_scenario() {
    let mut pos = Position::open(
        "SPY",
        Allocation::new(PositionSide::Long, 1.0),
        3.0,
        100_000.0,
        date(2024, 1, 2),
        100.0,
        Extreme::new(ExtremeKind::Max, 100.0, 1.0),
    );
    let net = pos.update(date(2024, 1, 3), 102.0);
    assert!((pos.current_value - 106_000.0).abs() < 1e-6);
    assert!((net - 6_000.0).abs() < 1e-6);
}

#[test]
fn short_mark_to_market_scenario() {
    let mut pos = Position::open(
        "SPY",
        Allocation::new(PositionSide::Short, 1.0),
        3.0,
        100_000.0,
        date(2024, 1, 2),
        100.0,
        Extreme::new(ExtremeKind::Min, 100.0, 1.0),
    );
    let net = pos.update(date(2024, 1, 3), 102.0);
    assert!((pos.current_value - 94_000.0).abs() < 1e-6);
    assert!((net + 6_000.0).abs() < 1e-6);
}

#[test]
fn cut_band_scenario() {
    let params = StrategyParams::default();
    let extreme = Extreme::new(ExtremeKind::Max, 110.0, 2.0);
    assert_eq!(extreme.threshold(1.0), 108.0);

    let band = classify(&extreme, 107.0, &params).unwrap();
    assert_eq!(band, AllocationBand::Cut);
    assert_eq!(
        target_allocation(band, &extreme, &params),
        Allocation::new(PositionSide::Long, 0.5)
    );
}

#[test]
fn close_on_threshold_stays_in_nearer_band() {
    let params = StrategyParams::default();
    let extreme = Extreme::new(ExtremeKind::Max, 110.0, 2.0);
    assert_eq!(classify(&extreme, 108.0, &params).unwrap(), AllocationBand::Full);
    assert_eq!(classify(&extreme, 107.0, &params).unwrap(), AllocationBand::Cut);
    assert_eq!(classify(&extreme, 106.0, &params).unwrap(), AllocationBand::Exit);
    assert_eq!(classify(&extreme, 105.0, &params).unwrap(), AllocationBand::Change);
}
