//! Allocation bands: ATR distance from the extreme → target exposure.
//!
//! | band   | retracement from extreme      | allocation                 |
//! |--------|-------------------------------|----------------------------|
//! | FULL   | ≤ cut                          | 100% aligned side          |
//! | CUT    | > cut, ≤ exit                  | partial, aligned side      |
//! | EXIT   | > exit, ≤ change               | 0%, aligned side (flat)    |
//! | CHANGE | > change, ≤ add                | partial, opposite side     |
//!
//! "Beyond" is strict, so a close exactly on a threshold stays in the band
//! nearer the extreme. Past `add` the extreme itself must already have
//! flipped; reaching that case is an invariant violation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::params::StrategyParams;
use crate::domain::{Allocation, Extreme};
use crate::engine::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationBand {
    Full,
    Cut,
    Exit,
    Change,
}

impl AllocationBand {
    pub const ALL: [AllocationBand; 4] = [
        AllocationBand::Full,
        AllocationBand::Cut,
        AllocationBand::Exit,
        AllocationBand::Change,
    ];
}

impl fmt::Display for AllocationBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AllocationBand::Full => "FULL",
            AllocationBand::Cut => "CUT",
            AllocationBand::Exit => "EXIT",
            AllocationBand::Change => "CHANGE",
        };
        f.write_str(name)
    }
}

/// Classify `close` against `extreme`.
pub fn classify(
    extreme: &Extreme,
    close: f64,
    params: &StrategyParams,
) -> Result<AllocationBand, SimulationError> {
    if extreme.is_beyond(close, params.add_multiple) {
        return Err(SimulationError::InvariantViolation(format!(
            "close {close:.4} is {:.3} ATR from {extreme}, past the add multiple {} without a flip",
            extreme.distance_in_atr(close),
            params.add_multiple
        )));
    }
    let band = if extreme.is_beyond(close, params.change_multiple) {
        AllocationBand::Change
    } else if extreme.is_beyond(close, params.exit_multiple) {
        AllocationBand::Exit
    } else if extreme.is_beyond(close, params.cut_multiple) {
        AllocationBand::Cut
    } else {
        AllocationBand::Full
    };
    Ok(band)
}

/// Target allocation for `band` given the extreme it was measured against.
pub fn target_allocation(
    band: AllocationBand,
    extreme: &Extreme,
    params: &StrategyParams,
) -> Allocation {
    let aligned = params.stance.aligned_side(extreme.kind);
    match band {
        AllocationBand::Full => Allocation::new(aligned, 1.0),
        AllocationBand::Cut => Allocation::new(aligned, params.partial_fraction(aligned)),
        AllocationBand::Exit => Allocation::new(aligned, 0.0),
        AllocationBand::Change => {
            let opposite = aligned.opposite();
            Allocation::new(opposite, params.partial_fraction(opposite))
        }
    }
}
