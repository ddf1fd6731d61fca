//! Tunable strategy parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ExtremeKind, PositionSide};
use crate::indicators::DEFAULT_ATR_WINDOW;

/// Invalid parameter combinations, rejected before a run starts.
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("ATR window must be at least 1")]
    ZeroAtrWindow,

    #[error("ATR multiples must be finite and strictly increasing from zero: cut={cut}, exit={exit}, change={change}, add={add}")]
    MultiplesNotIncreasing {
        cut: f64,
        exit: f64,
        change: f64,
        add: f64,
    },

    #[error("initial capital must be positive, got {0}")]
    NonPositiveCapital(f64),

    #[error("leverage must be positive, got {0}")]
    NonPositiveLeverage(f64),

    #[error("{name} must be within (0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },
}

/// How an extreme maps to the side held while price sits near it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    /// Ride the move: long near a MAX, short near a MIN.
    #[default]
    Trend,
    /// Fade the move: short near a MAX, long near a MIN.
    Reversion,
}

impl Stance {
    pub fn aligned_side(self, kind: ExtremeKind) -> PositionSide {
        match (self, kind) {
            (Stance::Trend, ExtremeKind::Max) | (Stance::Reversion, ExtremeKind::Min) => {
                PositionSide::Long
            }
            (Stance::Trend, ExtremeKind::Min) | (Stance::Reversion, ExtremeKind::Max) => {
                PositionSide::Short
            }
        }
    }
}

/// Everything the core decision logic depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Number of true ranges averaged into the ATR.
    pub atr_window: usize,
    pub cut_multiple: f64,
    pub exit_multiple: f64,
    pub change_multiple: f64,
    /// Also the distance at which the extreme flips.
    pub add_multiple: f64,
    pub initial_capital: f64,
    /// Multiple applied to the underlying's daily move.
    pub leverage: f64,
    pub long_partial_fraction: f64,
    pub short_partial_fraction: f64,
    pub stance: Stance,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            atr_window: DEFAULT_ATR_WINDOW,
            cut_multiple: 1.0,
            exit_multiple: 1.5,
            change_multiple: 2.0,
            add_multiple: 2.5,
            initial_capital: 100_000.0,
            leverage: 3.0,
            long_partial_fraction: 0.5,
            short_partial_fraction: 0.5,
            stance: Stance::Trend,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.atr_window == 0 {
            return Err(ParamsError::ZeroAtrWindow);
        }
        let multiples = [
            self.cut_multiple,
            self.exit_multiple,
            self.change_multiple,
            self.add_multiple,
        ];
        let increasing = multiples.iter().all(|m| m.is_finite())
            && self.cut_multiple > 0.0
            && multiples.windows(2).all(|w| w[0] < w[1]);
        if !increasing {
            return Err(ParamsError::MultiplesNotIncreasing {
                cut: self.cut_multiple,
                exit: self.exit_multiple,
                change: self.change_multiple,
                add: self.add_multiple,
            });
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ParamsError::NonPositiveCapital(self.initial_capital));
        }
        if !(self.leverage.is_finite() && self.leverage > 0.0) {
            return Err(ParamsError::NonPositiveLeverage(self.leverage));
        }
        for (name, value) in [
            ("long_partial_fraction", self.long_partial_fraction),
            ("short_partial_fraction", self.short_partial_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ParamsError::FractionOutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// Partial allocation used for `side` in the CUT and CHANGE bands.
    pub fn partial_fraction(&self, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => self.long_partial_fraction,
            PositionSide::Short => self.short_partial_fraction,
        }
    }
}
