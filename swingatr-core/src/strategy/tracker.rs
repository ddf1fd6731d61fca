//! Establishes the reference extreme before the first simulated day.
//!
//! The scan starts at the first bar with an available ATR (the reference bar)
//! and walks forward to the start bar inclusive. Until an extreme exists, a
//! close more than `add_multiple` reference ATRs away from the reference close
//! creates one (MAX above, MIN below). After that every close extends or flips
//! it exactly as during the simulation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Bar, Extreme, ExtremeKind, ExtremeUpdate};
use crate::engine::SimulationError;

/// Result of the pre-start scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeScan {
    pub extreme: Extreme,
    pub reference_date: NaiveDate,
    /// Number of MAX/MIN flips seen during the scan.
    pub flips: usize,
    /// True when no extreme formed and it was anchored at the start bar.
    pub anchored_at_start: bool,
}

/// Scan `bars[..=start_index]` for the extreme in force at the start bar.
pub fn establish_extreme(
    bars: &[Bar],
    start_index: usize,
    add_multiple: f64,
) -> Result<ExtremeScan, SimulationError> {
    let start = bars.get(start_index).ok_or(SimulationError::NoBarsInRange)?;
    let start_atr = start.atr.ok_or(SimulationError::InsufficientHistory {
        date: start.date,
        bars_available: start_index + 1,
    })?;

    // The start bar has an ATR, so a reference bar exists at or before it.
    let reference_index = bars[..=start_index]
        .iter()
        .position(Bar::has_atr)
        .unwrap_or(start_index);
    let reference = &bars[reference_index];
    let reference_atr = reference.atr.unwrap_or(start_atr);

    let mut current: Option<Extreme> = None;
    let mut flips = 0;

    for bar in &bars[reference_index..=start_index] {
        let Some(atr) = bar.atr else { continue };
        match current.as_mut() {
            None => {
                let band = add_multiple * reference_atr;
                if bar.close > reference.close + band {
                    current = Some(Extreme::new(ExtremeKind::Max, bar.close, atr));
                } else if bar.close < reference.close - band {
                    current = Some(Extreme::new(ExtremeKind::Min, bar.close, atr));
                }
            }
            Some(extreme) => {
                if let ExtremeUpdate::Flipped { .. } = extreme.observe(bar.close, atr, add_multiple)
                {
                    flips += 1;
                }
            }
        }
    }

    let (extreme, anchored_at_start) = match current {
        Some(extreme) => (extreme, false),
        None => {
            let kind = if start.close >= reference.close {
                ExtremeKind::Max
            } else {
                ExtremeKind::Min
            };
            warn!(
                reference = %reference.date,
                start = %start.date,
                "no extreme formed before start; anchoring {kind} at the start close"
            );
            (Extreme::new(kind, start.close, start_atr), true)
        }
    };

    Ok(ExtremeScan {
        extreme,
        reference_date: reference.date,
        flips,
        anchored_at_start,
    })
}
