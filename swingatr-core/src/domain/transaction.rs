//! Transaction: one change of allocation, with the band that triggered it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::extreme::Extreme;
use super::position::Allocation;
use crate::strategy::AllocationBand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// First position of the run.
    Entry,
    /// Same side, different fraction; the position is resized in place.
    Rescale,
    /// Side change; the position is closed and replaced.
    Flip,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::Entry => "ENTRY",
            TransactionKind::Rescale => "RESCALE",
            TransactionKind::Flip => "FLIP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub kind: TransactionKind,
    /// Close the change was applied at.
    pub price: f64,
    /// `None` for the entry.
    pub from: Option<Allocation>,
    pub to: Allocation,
    pub band: AllocationBand,
    /// Capital moved into (positive) or out of (negative) the market.
    pub capital_delta: f64,
    pub portfolio_value: f64,
    /// Extreme in force when the change was made.
    pub extreme: Extreme,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self
            .from
            .map(|a| a.to_string())
            .unwrap_or_else(|| "none".to_string());
        write!(
            f,
            "{} {} @ ${:.2}: {} -> {} [{}] capital {:+.2}, portfolio ${:.2}",
            self.date,
            self.kind,
            self.price,
            from,
            self.to,
            self.band,
            self.capital_delta,
            self.portfolio_value
        )
    }
}
