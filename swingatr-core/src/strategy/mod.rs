//! ATR-band strategy: parameters, band classification and the extreme scan.

pub mod bands;
pub mod params;
pub mod tracker;

pub use bands::{classify, target_allocation, AllocationBand};
pub use params::{ParamsError, Stance, StrategyParams};
pub use tracker::{establish_extreme, ExtremeScan};
