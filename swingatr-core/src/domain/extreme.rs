//! Extreme: the local price pivot the strategy measures distance from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of price action the extreme marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtremeKind {
    Min,
    Max,
}

impl ExtremeKind {
    pub fn opposite(self) -> Self {
        match self {
            ExtremeKind::Min => ExtremeKind::Max,
            ExtremeKind::Max => ExtremeKind::Min,
        }
    }
}

impl fmt::Display for ExtremeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtremeKind::Min => write!(f, "MIN"),
            ExtremeKind::Max => write!(f, "MAX"),
        }
    }
}

/// Outcome of feeding a close into an extreme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtremeUpdate {
    Unchanged,
    /// The close pushed the extreme further in its own direction.
    Extended,
    /// The close retraced past the flip threshold; the extreme now has the
    /// opposite kind, anchored at that close.
    Flipped { from: ExtremeKind },
}

/// Most recent pivot price and the ATR measured on that bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    pub kind: ExtremeKind,
    pub value: f64,
    pub atr: f64,
}

impl Extreme {
    pub fn new(kind: ExtremeKind, value: f64, atr: f64) -> Self {
        Self { kind, value, atr }
    }

    /// Price `multiple` ATRs away from the extreme, on the retracement side.
    ///
    /// MAX: `value - atr * multiple`; MIN: `value + atr * multiple`.
    pub fn threshold(&self, multiple: f64) -> f64 {
        match self.kind {
            ExtremeKind::Max => self.value - self.atr * multiple,
            ExtremeKind::Min => self.value + self.atr * multiple,
        }
    }

    /// Whether `close` lies strictly past the `multiple` threshold.
    ///
    /// A close exactly on the threshold is not beyond it.
    pub fn is_beyond(&self, close: f64, multiple: f64) -> bool {
        let threshold = self.threshold(multiple);
        match self.kind {
            ExtremeKind::Max => close < threshold,
            ExtremeKind::Min => close > threshold,
        }
    }

    /// Retracement from the extreme to `close`, in ATR units.
    ///
    /// Negative when the close has moved past the extreme in its own direction.
    pub fn distance_in_atr(&self, close: f64) -> f64 {
        let retracement = match self.kind {
            ExtremeKind::Max => self.value - close,
            ExtremeKind::Min => close - self.value,
        };
        if self.atr > 0.0 {
            retracement / self.atr
        } else if retracement > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    /// Feed one close (with its ATR): extend the extreme when the close makes a
    /// new high (MAX) or low (MIN); flip it when the close retraces strictly
    /// past `flip_multiple` ATRs.
    pub fn observe(&mut self, close: f64, atr: f64, flip_multiple: f64) -> ExtremeUpdate {
        let extends = match self.kind {
            ExtremeKind::Max => close > self.value,
            ExtremeKind::Min => close < self.value,
        };
        if extends {
            self.value = close;
            self.atr = atr;
            return ExtremeUpdate::Extended;
        }
        if self.is_beyond(close, flip_multiple) {
            let from = self.kind;
            *self = Extreme::new(from.opposite(), close, atr);
            return ExtremeUpdate::Flipped { from };
        }
        ExtremeUpdate::Unchanged
    }
}

impl fmt::Display for Extreme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ${:.2} (ATR {:.2})", self.kind, self.value, self.atr)
    }
}
