//! Average True Range (ATR).
//!
//! True Range: max(|high-low|, |high-prev_close|, |low-prev_close|)
//! ATR is the plain arithmetic mean of the most recent `window` true ranges.
//! No exponential smoothing.
//!
//! The value that completes the window is still reported as unavailable; the
//! first mean is produced when the next true range evicts the oldest entry.

use std::collections::VecDeque;

use crate::domain::Bar;

/// Default number of true ranges averaged.
pub const DEFAULT_ATR_WINDOW: usize = 50;

/// True range of `curr` relative to the previous bar's close.
pub fn true_range(prev: &Bar, curr: &Bar) -> f64 {
    true_range_values(curr.high, curr.low, prev.close)
}

/// True range from raw values.
pub fn true_range_values(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low)
        .abs()
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// Streaming fixed-capacity sliding window of true ranges.
#[derive(Debug, Clone)]
pub struct RollingAtr {
    window: usize,
    values: VecDeque<f64>,
}

impl RollingAtr {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            values: VecDeque::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Feed one true range.
    ///
    /// While fewer than `window` values are held the value is appended and
    /// `None` is returned. Once full, the oldest value is evicted, the new one
    /// appended and the window mean returned.
    pub fn update(&mut self, true_range: f64) -> Option<f64> {
        if self.values.len() < self.window {
            self.values.push_back(true_range);
            return None;
        }
        self.values.pop_front();
        self.values.push_back(true_range);
        let sum: f64 = self.values.iter().sum();
        Some(sum / self.window as f64)
    }

    /// Feed the true range between two consecutive bars.
    pub fn update_bars(&mut self, prev: &Bar, curr: &Bar) -> Option<f64> {
        self.update(true_range(prev, curr))
    }

    /// Number of true ranges currently held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Compute the ATR series for a slice of bars without mutating them.
pub fn atr_series(bars: &[Bar], window: usize) -> Vec<Option<f64>> {
    let mut rolling = RollingAtr::new(window);
    let mut out = Vec::with_capacity(bars.len());
    if bars.is_empty() {
        return out;
    }
    out.push(None);
    for pair in bars.windows(2) {
        out.push(rolling.update_bars(&pair[0], &pair[1]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // max(8, 6, 2) = 8
            (106.0, 107.0, 98.0, 99.0),   // max(9, 1, 8) = 9
        ]);
        assert_approx(true_range(&bars[0], &bars[1]), 8.0, DEFAULT_EPSILON);
        assert_approx(true_range(&bars[1], &bars[2]), 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // max(7, 15, 8) = 15
        ]);
        assert_approx(true_range(&bars[0], &bars[1]), 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        assert_approx(true_range_values(92.0, 90.0, 100.0), 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_returns_none_until_window_overflows() {
        let mut atr = RollingAtr::new(3);
        assert_eq!(atr.update(1.0), None);
        assert_eq!(atr.update(2.0), None);
        assert_eq!(atr.update(3.0), None);
        assert_eq!(atr.len(), 3);
        // evicts 1.0 -> mean(2, 3, 4)
        assert_approx(atr.update(4.0).unwrap(), 3.0, DEFAULT_EPSILON);
        // evicts 2.0 -> mean(3, 4, 8)
        assert_approx(atr.update(8.0).unwrap(), 5.0, DEFAULT_EPSILON);
        assert_eq!(atr.len(), 3);
    }

    #[test]
    fn counting_sequence_matches_window_mean() {
        // 0, 1, 2, ... with window 50: first mean at value 50 = mean(1..=50).
        let mut atr = RollingAtr::new(DEFAULT_ATR_WINDOW);
        let mut first = None;
        for i in 0..100 {
            if let Some(v) = atr.update(i as f64) {
                first.get_or_insert((i, v));
            }
        }
        let (at, value) = first.unwrap();
        assert_eq!(at, 50);
        assert_approx(value, 25.5, DEFAULT_EPSILON);
    }

    #[test]
    fn series_first_bar_is_unavailable() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // 8
            (106.0, 107.0, 98.0, 99.0),   // 9
            (99.0, 103.0, 97.0, 101.0),   // 6
            (101.0, 106.0, 100.0, 105.0), // 6
        ]);
        let series = atr_series(&bars, 2);
        assert_eq!(series.len(), 5);
        assert!(series[0].is_none());
        assert!(series[1].is_none());
        assert!(series[2].is_none());
        assert_approx(series[3].unwrap(), 7.5, DEFAULT_EPSILON);
        assert_approx(series[4].unwrap(), 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_window_is_clamped() {
        let atr = RollingAtr::new(0);
        assert_eq!(atr.window(), 1);
    }
}
