//! Domain types for the swing backtester

pub mod bar;
pub mod extreme;
pub mod portfolio;
pub mod position;
pub mod transaction;

pub use bar::{annotate_atr, Bar, BarSeries};
pub use extreme::{Extreme, ExtremeKind, ExtremeUpdate};
pub use portfolio::{Portfolio, SimulationState};
pub use position::{Allocation, Position, PositionSide};
pub use transaction::{Transaction, TransactionKind};

/// Symbol type alias
pub type Symbol = String;
