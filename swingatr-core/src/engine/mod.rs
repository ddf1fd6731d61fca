//! Simulation engine: the daily mark-to-market and rebalance loop.
//!
//! Each trading day inside the range runs three phases, in order:
//!
//! 1. Mark-to-market: the position compounds the day's close-to-close move.
//! 2. Extreme update: the close extends or flips the reference extreme.
//! 3. Rebalance: the close is classified into a band and the position is
//!    resized (same side) or replaced (side change) when the target differs.

pub mod error;
pub mod simulation;

pub use error::SimulationError;
pub use simulation::{run_simulation, DayOutcome, Simulation, SimulationOutcome};
