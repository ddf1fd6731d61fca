//! Portfolio: run-level value, the active position and the output logs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::Position;
use super::transaction::Transaction;

/// Lifecycle of a run. The position exists exactly while the run is active
/// (and is kept, frozen, once it finishes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationState {
    Uninitialized,
    Active(Position),
    Finished(Position),
}

/// Aggregate state of a single-symbol run.
///
/// `current_value` is cash plus the position's value. It starts at
/// `initial_value` and only changes through the position's daily
/// mark-to-market; rebalancing moves capital between cash and the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub current_date: NaiveDate,
    pub initial_value: f64,
    pub current_value: f64,
    pub state: SimulationState,
    /// Positions replaced by a side change, oldest first.
    pub closed_positions: Vec<Position>,
    pub transactions: Vec<Transaction>,
}

impl Portfolio {
    pub fn new(
        symbol: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        initial_value: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            start_date,
            end_date,
            current_date: start_date,
            initial_value,
            current_value: initial_value,
            state: SimulationState::Uninitialized,
            closed_positions: Vec::new(),
            transactions: Vec::new(),
        }
    }

    pub fn current_position(&self) -> Option<&Position> {
        match &self.state {
            SimulationState::Uninitialized => None,
            SimulationState::Active(p) | SimulationState::Finished(p) => Some(p),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SimulationState::Finished(_))
    }

    /// Value not committed to the position.
    pub fn cash(&self) -> f64 {
        self.current_value - self.current_position().map_or(0.0, |p| p.current_value)
    }

    pub fn total_return(&self) -> f64 {
        if self.initial_value == 0.0 {
            return 0.0;
        }
        self.current_value / self.initial_value - 1.0
    }

    pub fn last_transaction(&self) -> Option<&Transaction> {
        self.transactions.last()
    }
}

impl fmt::Display for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - Current Capital: ${:.2}; Current Position: ",
            self.current_date, self.current_value
        )?;
        match self.current_position() {
            Some(p) => write!(f, "{p}"),
            None => write!(f, "none"),
        }
    }
}
