//! Position: the single leveraged exposure held by the portfolio.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::extreme::Extreme;

/// Direction of the exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn opposite(self) -> Self {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }

    /// Value multiplier for one day's percentage move of the underlying.
    pub fn growth_factor(self, percent_change: f64, leverage: f64) -> f64 {
        match self {
            PositionSide::Long => 1.0 + percent_change * leverage,
            PositionSide::Short => 1.0 - percent_change * leverage,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Target exposure: a side and the fraction of portfolio value committed to it.
///
/// A zero fraction is a flat position that still remembers its side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub side: PositionSide,
    pub fraction: f64,
}

impl Allocation {
    pub fn new(side: PositionSide, fraction: f64) -> Self {
        Self { side, fraction }
    }

    pub fn is_flat(&self) -> bool {
        self.fraction == 0.0
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}% {}", self.fraction * 100.0, self.side)
    }
}

/// Open exposure with daily mark-to-market state.
///
/// Each position owns its referenced extreme; replacing a position copies the
/// extreme into the new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    pub leverage: f64,
    /// Fraction of portfolio value this position was last sized to.
    pub fraction: f64,
    /// Net capital committed: the opening amount plus every later scale delta.
    pub initial_investment: f64,
    pub current_value: f64,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub extreme: Extreme,
    pub current_date: NaiveDate,
    pub current_price: f64,
}

impl Position {
    pub fn open(
        symbol: impl Into<String>,
        allocation: Allocation,
        leverage: f64,
        capital: f64,
        date: NaiveDate,
        price: f64,
        extreme: Extreme,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: allocation.side,
            leverage,
            fraction: allocation.fraction,
            initial_investment: capital,
            current_value: capital,
            entry_date: date,
            entry_price: price,
            extreme,
            current_date: date,
            current_price: price,
        }
    }

    pub fn allocation(&self) -> Allocation {
        Allocation::new(self.side, self.fraction)
    }

    pub fn is_flat(&self) -> bool {
        self.fraction == 0.0
    }

    /// Mark to market at `close`, returning the signed change in value.
    ///
    /// Compounding is path-dependent: call once per trading day, in order.
    pub fn update(&mut self, date: NaiveDate, close: f64) -> f64 {
        let percent_change = close / self.current_price - 1.0;
        let previous = self.current_value;
        self.current_value *= self.side.growth_factor(percent_change, self.leverage);
        self.current_price = close;
        self.current_date = date;
        self.current_value - previous
    }

    /// Resize in place to `target_value` at `fraction` of the portfolio.
    /// Returns the capital moved into (positive) or out of (negative) the position.
    pub fn scale_to(&mut self, fraction: f64, target_value: f64) -> f64 {
        let delta = target_value - self.current_value;
        self.initial_investment += delta;
        self.current_value = target_value;
        self.fraction = fraction;
        delta
    }

    /// Profit or loss on the capital committed so far.
    pub fn pnl(&self) -> f64 {
        self.current_value - self.initial_investment
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x{:.1} | {:.0}% allocated | value ${:.2} | entered {} @ ${:.2} | last {} @ ${:.2} | ref {}",
            self.side,
            self.symbol,
            self.leverage,
            self.fraction * 100.0,
            self.current_value,
            self.entry_date,
            self.entry_price,
            self.current_date,
            self.current_price,
            self.extreme
        )
    }
}
