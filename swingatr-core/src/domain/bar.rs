//! Daily bars and the ATR-annotated series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::provider::RawBar;
use crate::indicators::atr::RollingAtr;

/// Daily OHLCV bar with its trailing ATR.
///
/// `atr` is `None` until the rolling true-range window has filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_close: f64,
    pub atr: Option<f64>,
}

impl Bar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.adj_close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    pub fn has_atr(&self) -> bool {
        self.atr.is_some()
    }
}

impl From<RawBar> for Bar {
    fn from(raw: RawBar) -> Self {
        Self {
            date: raw.date,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            adj_close: raw.adj_close,
            atr: None,
        }
    }
}

/// Chronological (oldest-first) bar series for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series from chronological raw bars, annotating each bar with the
    /// rolling ATR over `atr_window` true ranges.
    pub fn from_raw(symbol: impl Into<String>, raw: Vec<RawBar>, atr_window: usize) -> Self {
        let mut bars: Vec<Bar> = raw.into_iter().map(Bar::from).collect();
        annotate_atr(&mut bars, atr_window);
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Index of the first bar whose ATR is available.
    pub fn first_atr_index(&self) -> Option<usize> {
        self.bars.iter().position(Bar::has_atr)
    }

    /// Index of the first bar dated on or after `date`.
    pub fn index_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        self.bars.iter().position(|b| b.date >= date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

/// Annotate bars in place, in chronological order. Bar 0 has no previous close
/// and never receives a true range.
pub fn annotate_atr(bars: &mut [Bar], atr_window: usize) {
    let mut atr = RollingAtr::new(atr_window);
    if let Some(first) = bars.first_mut() {
        first.atr = None;
    }
    for i in 1..bars.len() {
        let (prev, curr) = (&bars[i - 1], &bars[i]);
        let value = atr.update_bars(prev, curr);
        bars[i].atr = value;
    }
}
