use chrono::NaiveDate;
use thiserror::Error;

use crate::strategy::ParamsError;

/// Fatal errors raised while simulating a run. None of them are recoverable
/// mid-run; the caller reports and aborts.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid strategy parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("no ATR available on {date}: only {bars_available} bars of history")]
    InsufficientHistory {
        date: NaiveDate,
        bars_available: usize,
    },

    #[error("ATR missing on {date} after the run started")]
    UnavailableAtr { date: NaiveDate },

    #[error("no bars fall inside the simulation range")]
    NoBarsInRange,

    #[error("bar {next} does not follow {previous}; daily steps must be in date order")]
    OutOfOrder {
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("simulation has already finished")]
    AlreadyFinished,

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
