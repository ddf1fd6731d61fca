//! Pivot and trend-line detection for the multi-symbol setup scan.
//!
//! Pivots are bars whose low (or high) dominates a window around them. Lines
//! through pairs of pivots are grouped by slope, and the lines crossing the
//! most recent bar are paired into a channel/trend setup.

pub mod detect;
pub mod line;
pub mod setup;

pub use detect::{build_lines, classify_line, detect_lines, find_pivots, ClassifiedLines, PivotConfig};
pub use line::{Line, LineKind, PivotSide};
pub use setup::{analyze, best_setup, intersections, Intersection, PivotAnalysis, Setup};
