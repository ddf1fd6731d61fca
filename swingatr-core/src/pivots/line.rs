//! Straight lines through two pivots, in bar-index space.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Bar;

/// Tolerance for "lies beyond the line" checks; the end pivot sits on it.
const ON_LINE_EPSILON: f64 = 1e-9;

/// Which extreme of each bar the lines are drawn through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotSide {
    /// Lines under the lows (support).
    Low,
    /// Lines over the highs (resistance).
    High,
}

impl PivotSide {
    pub fn price(self, bar: &Bar) -> f64 {
        match self {
            PivotSide::Low => bar.low,
            PivotSide::High => bar.high,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    TrendLine,
    TrendChannelLine,
    Horizontal,
}

impl LineKind {
    pub fn label(self, side: PivotSide) -> &'static str {
        match (self, side) {
            (LineKind::TrendLine, _) => "Trend Line",
            (LineKind::TrendChannelLine, _) => "Trend Channel Line",
            (LineKind::Horizontal, PivotSide::Low) => "Support",
            (LineKind::Horizontal, PivotSide::High) => "Resistance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub x1: usize,
    pub y1: f64,
    pub x2: usize,
    pub y2: f64,
}

impl Line {
    pub fn through(bars: &[Bar], side: PivotSide, x1: usize, x2: usize) -> Self {
        Self {
            x1,
            y1: side.price(&bars[x1]),
            x2,
            y2: side.price(&bars[x2]),
        }
    }

    pub fn slope(&self) -> f64 {
        (self.y2 - self.y1) / (self.x2 as f64 - self.x1 as f64)
    }

    pub fn projection(&self, x: usize) -> f64 {
        self.y1 + self.slope() * (x as f64 - self.x1 as f64)
    }

    /// Projection at `x` when it falls within `[low, high]`.
    pub fn crosses(&self, x: usize, high: f64, low: f64) -> Option<f64> {
        let p = self.projection(x);
        (p <= high && p >= low).then_some(p)
    }

    /// True when none of `pivots` pokes through the line on `side`.
    pub fn contains_pivots(&self, bars: &[Bar], side: PivotSide, pivots: &[usize]) -> bool {
        pivots.iter().all(|&i| {
            let projection = self.projection(i);
            match side {
                PivotSide::Low => bars[i].low >= projection - ON_LINE_EPSILON,
                PivotSide::High => bars[i].high <= projection + ON_LINE_EPSILON,
            }
        })
    }

    /// Two-line description with each anchor's date, price and index.
    pub fn describe(&self, bars: &[Bar]) -> String {
        let date = |i: usize| {
            bars.get(i)
                .map(|b| b.date.to_string())
                .unwrap_or_else(|| "?".to_string())
        };
        format!(
            "{} - ${:.2} - {}\n{} - ${:.2} - {}\n",
            date(self.x1),
            self.y1,
            self.x1,
            date(self.x2),
            self.y2,
            self.x2
        )
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {:.2}) -> ({}, {:.2})",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}
