//! Report artifacts: text summary, transaction CSV and JSON result.
//!
//! `save_artifacts` writes, for symbol `SYM`:
//! - `SYM_summary.txt`: human-readable run summary
//! - `SYM_transactions.csv`: one row per allocation change
//! - `SYM_result.json`: the full `BacktestResult`, with `schema_version`
//!
//! Unknown schema versions are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use swingatr_core::data::DataSource;
use swingatr_core::domain::Transaction;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// Paths written by `save_artifacts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub summary: PathBuf,
    pub transactions: PathBuf,
    pub result: PathBuf,
}

impl ReportPaths {
    pub fn for_symbol(output_dir: &Path, symbol: &str) -> Self {
        Self {
            summary: output_dir.join(format!("{symbol}_summary.txt")),
            transactions: output_dir.join(format!("{symbol}_transactions.csv")),
            result: output_dir.join(format!("{symbol}_result.json")),
        }
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting schema versions newer than ours.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: date, kind, price, from_side, from_fraction, to_side,
/// to_fraction, band, capital_delta, portfolio_value, extreme_kind,
/// extreme_value, extreme_atr
pub fn export_transactions_csv(transactions: &[Transaction]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "date",
        "kind",
        "price",
        "from_side",
        "from_fraction",
        "to_side",
        "to_fraction",
        "band",
        "capital_delta",
        "portfolio_value",
        "extreme_kind",
        "extreme_value",
        "extreme_atr",
    ])?;

    for t in transactions {
        let (from_side, from_fraction) = match t.from {
            Some(a) => (a.side.to_string(), format!("{:.4}", a.fraction)),
            None => (String::new(), String::new()),
        };
        wtr.write_record([
            t.date.to_string(),
            t.kind.to_string(),
            format!("{:.4}", t.price),
            from_side,
            from_fraction,
            t.to.side.to_string(),
            format!("{:.4}", t.to.fraction),
            t.band.to_string(),
            format!("{:.2}", t.capital_delta),
            format!("{:.2}", t.portfolio_value),
            t.extreme.kind.to_string(),
            format!("{:.4}", t.extreme.value),
            format!("{:.4}", t.extreme.atr),
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

// ─── Text summary ───────────────────────────────────────────────────

fn source_label(source: DataSource) -> &'static str {
    match source {
        DataSource::Http => "http",
        DataSource::CsvFile => "csv file",
        DataSource::Synthetic => "synthetic",
    }
}

pub fn render_summary(result: &BacktestResult) -> String {
    let mut out = String::with_capacity(1024);
    let _ = writeln!(out, "Symbol: {}", result.symbol);
    let _ = writeln!(out, "Period: {} to {}", result.start_date, result.end_date);
    let _ = writeln!(out, "Initial Value: ${:.2}", result.initial_value);
    let _ = writeln!(out, "Final Value: ${:.2}", result.final_value);
    let _ = writeln!(out, "Total Return: {:.2}%", result.total_return * 100.0);
    let _ = writeln!(out, "Max Drawdown: {:.2}%", result.max_drawdown * 100.0);
    match &result.final_position {
        Some(p) => {
            let _ = writeln!(out, "Final Position: {p}");
        }
        None => out.push_str("Final Position: none\n"),
    }
    let _ = writeln!(out, "Closed Positions: {}", result.closed_positions.len());
    let _ = writeln!(out, "Transactions: {}", result.transactions.len());
    match result.transactions.last() {
        Some(t) => {
            let _ = writeln!(out, "Last Transaction: {t}");
        }
        None => out.push_str("Last Transaction: none\n"),
    }
    let _ = writeln!(
        out,
        "Data: {} bars from {} ({} void skipped), dataset {}",
        result.bar_count,
        source_label(result.source),
        result.void_bars_skipped,
        result.dataset_hash
    );
    if result.is_synthetic {
        out.push_str("WARNING: results computed on synthetic data\n");
    }
    out
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// Write all three artifacts into `output_dir`, creating it if needed.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<ReportPaths> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let paths = ReportPaths::for_symbol(output_dir, &result.symbol);

    std::fs::write(&paths.summary, render_summary(result))
        .with_context(|| format!("failed to write {}", paths.summary.display()))?;
    std::fs::write(
        &paths.transactions,
        export_transactions_csv(&result.transactions)?,
    )
    .with_context(|| format!("failed to write {}", paths.transactions.display()))?;
    std::fs::write(&paths.result, export_json(result)?)
        .with_context(|| format!("failed to write {}", paths.result.display()))?;

    Ok(paths)
}

pub fn load_artifacts(output_dir: &Path, symbol: &str) -> Result<BacktestResult> {
    let path = ReportPaths::for_symbol(output_dir, symbol).result;
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use swingatr_core::domain::{
        Allocation, Extreme, ExtremeKind, Position, PositionSide, TransactionKind,
    };
    use swingatr_core::strategy::{AllocationBand, StrategyParams};

    use crate::runner::EquityPoint;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn sample_result() -> BacktestResult {
        let extreme = Extreme::new(ExtremeKind::Max, 110.0, 2.0);
        let entry = Transaction {
            date: date(1),
            kind: TransactionKind::Entry,
            price: 110.0,
            from: None,
            to: Allocation::new(PositionSide::Long, 1.0),
            band: AllocationBand::Full,
            capital_delta: 100_000.0,
            portfolio_value: 100_000.0,
            extreme,
        };
        let cut = Transaction {
            date: date(4),
            kind: TransactionKind::Rescale,
            price: 107.0,
            from: Some(Allocation::new(PositionSide::Long, 1.0)),
            to: Allocation::new(PositionSide::Long, 0.5),
            band: AllocationBand::Cut,
            capital_delta: -45_909.09,
            portfolio_value: 91_818.18,
            extreme,
        };
        let mut position = Position::open(
            "SPY",
            Allocation::new(PositionSide::Long, 0.5),
            3.0,
            45_909.09,
            date(1),
            110.0,
            extreme,
        );
        position.update(date(4), 107.0);

        BacktestResult {
            schema_version: SCHEMA_VERSION,
            symbol: "SPY".into(),
            start_date: date(1),
            end_date: date(4),
            params: StrategyParams::default(),
            initial_value: 100_000.0,
            final_value: 91_818.18,
            total_return: -0.0818182,
            max_drawdown: 0.0818182,
            final_position: Some(position),
            closed_positions: vec![],
            transactions: vec![entry, cut],
            equity_curve: vec![
                EquityPoint {
                    date: date(1),
                    close: 110.0,
                    value: 100_000.0,
                    band: AllocationBand::Full,
                },
                EquityPoint {
                    date: date(4),
                    close: 107.0,
                    value: 91_818.18,
                    band: AllocationBand::Cut,
                },
            ],
            bar_count: 60,
            void_bars_skipped: 0,
            dataset_hash: "abc123".into(),
            source: DataSource::CsvFile,
            is_synthetic: false,
        }
    }

    fn assert_same(a: &BacktestResult, b: &BacktestResult) {
        assert_eq!(a.symbol, b.symbol);
        assert_eq!((a.start_date, a.end_date), (b.start_date, b.end_date));
        assert_eq!(a.params, b.params);
        assert!((a.final_value - b.final_value).abs() < 1e-6);
        assert_eq!(a.transactions.len(), b.transactions.len());
        for (x, y) in a.transactions.iter().zip(&b.transactions) {
            assert_eq!((x.date, x.kind, x.band), (y.date, y.kind, y.band));
            assert!((x.portfolio_value - y.portfolio_value).abs() < 1e-6);
        }
        assert_eq!(a.equity_curve.len(), b.equity_curve.len());
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.source, b.source);
    }

    #[test]
    fn json_roundtrip() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        assert_same(&import_json(&json).unwrap(), &result);
    }

    #[test]
    fn json_without_schema_version_defaults() {
        let mut value = serde_json::to_value(sample_result()).unwrap();
        value.as_object_mut().unwrap().remove("schema_version");
        let result = import_json(&value.to_string()).unwrap();
        assert_eq!(result.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_version_is_rejected() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&result).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn transactions_csv_has_one_row_per_change() {
        let csv = export_transactions_csv(&sample_result().transactions).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,kind,price,from_side"));
        assert!(lines[1].starts_with("2024-03-01,ENTRY,110.0000,,,LONG,1.0000,FULL"));
        assert!(lines[2].starts_with("2024-03-04,RESCALE,107.0000,LONG,1.0000,LONG,0.5000,CUT"));
        assert!(lines[2].ends_with("MAX,110.0000,2.0000"));
    }

    #[test]
    fn summary_mentions_the_essentials() {
        let summary = render_summary(&sample_result());
        assert!(summary.contains("Symbol: SPY"));
        assert!(summary.contains("Period: 2024-03-01 to 2024-03-04"));
        assert!(summary.contains("Initial Value: $100000.00"));
        assert!(summary.contains("Final Value: $91818.18"));
        assert!(summary.contains("Total Return: -8.18%"));
        assert!(summary.contains("Final Position: LONG SPY"));
        assert!(summary.contains("Transactions: 2"));
        assert!(summary.contains("Last Transaction: 2024-03-04 RESCALE"));
        assert!(!summary.contains("synthetic data"));
    }

    #[test]
    fn synthetic_results_are_flagged() {
        let mut result = sample_result();
        result.is_synthetic = true;
        result.source = DataSource::Synthetic;
        assert!(render_summary(&result).contains("WARNING: results computed on synthetic data"));
    }

    #[test]
    fn save_and_load_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let result = sample_result();

        let paths = save_artifacts(&result, &out).unwrap();
        assert_eq!(paths.summary, out.join("SPY_summary.txt"));
        assert!(paths.summary.exists());
        assert!(paths.transactions.exists());
        assert!(paths.result.exists());

        assert_same(&load_artifacts(&out, "SPY").unwrap(), &result);
    }

    #[test]
    fn load_missing_artifacts_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_artifacts(dir.path(), "SPY").is_err());
    }
}
