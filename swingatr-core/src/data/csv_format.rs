//! Daily price CSV wire format.
//!
//! Headered, one row per trading day:
//! `Date,Open,High,Low,Close,Volume,Adj Close`. Columns are found by header
//! name in any order; `Adj Close` may also be spelled `AdjClose` or
//! `adj_close`. Volume and adjusted close are optional.

use chrono::NaiveDate;
use std::io::Read;
use tracing::warn;

use super::provider::{DataError, RawBar};

const DATE_FORMAT: &str = "%Y-%m-%d";

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    adj_close: Option<usize>,
}

fn normalize(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, DataError> {
        let names: Vec<String> = headers.iter().map(normalize).collect();
        let find = |name: &str| names.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| DataError::Parse(format!("missing '{name}' column")))
        };
        Ok(Self {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
            adj_close: find("adjclose"),
        })
    }
}

fn price(record: &csv::StringRecord, index: usize) -> Option<f64> {
    record
        .get(index)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse a price CSV into chronological bars.
///
/// Rows with a missing or non-numeric OHLC field (`null` on holidays) are
/// skipped. Newest-first files are reversed. Duplicate or out-of-order dates
/// are rejected.
pub fn parse_price_csv<R: Read>(symbol: &str, reader: R) -> Result<Vec<RawBar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| DataError::Parse(format!("{symbol}: {e}")))?
        .clone();
    let cols = Columns::from_headers(&headers)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| DataError::Parse(format!("{symbol}: {e}")))?;
        let raw_date = record.get(cols.date).unwrap_or_default();
        if raw_date.is_empty() {
            skipped += 1;
            continue;
        }
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|e| {
            DataError::Parse(format!("{symbol}: row {}: bad date '{raw_date}': {e}", line + 2))
        })?;

        let (Some(open), Some(high), Some(low), Some(close)) = (
            price(&record, cols.open),
            price(&record, cols.high),
            price(&record, cols.low),
            price(&record, cols.close),
        ) else {
            skipped += 1;
            continue;
        };

        let volume = cols
            .volume
            .and_then(|i| record.get(i))
            .and_then(|s| s.parse::<f64>().ok())
            .map_or(0, |v| v.max(0.0) as u64);
        let adj_close = cols
            .adj_close
            .and_then(|i| price(&record, i))
            .unwrap_or(close);

        bars.push(RawBar {
            date,
            open,
            high,
            low,
            close,
            volume,
            adj_close,
        });
    }

    if skipped > 0 {
        warn!(symbol, skipped, "skipped rows without complete prices");
    }
    if bars.is_empty() {
        return Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }

    if bars.len() > 1 && bars[0].date > bars[bars.len() - 1].date {
        bars.reverse();
    }
    if let Some(pair) = bars.windows(2).find(|w| w[0].date >= w[1].date) {
        return Err(DataError::Validation(format!(
            "{symbol}: dates not strictly ascending at {} -> {}",
            pair[0].date, pair[1].date
        )));
    }

    Ok(bars)
}

/// Write bars in the same format [`parse_price_csv`] reads.
pub fn write_price_csv<W: std::io::Write>(writer: W, bars: &[RawBar]) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let to_err = |e: csv::Error| DataError::Parse(e.to_string());
    wtr.write_record(["Date", "Open", "High", "Low", "Close", "Volume", "Adj Close"])
        .map_err(to_err)?;
    for bar in bars {
        wtr.write_record([
            bar.date.format(DATE_FORMAT).to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
            bar.adj_close.to_string(),
        ])
        .map_err(to_err)?;
    }
    wtr.flush().map_err(|e| DataError::Parse(e.to_string()))
}
