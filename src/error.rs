use chrono::{DateTime, Utc};
use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Result type for operations that may fail for reasons outside of this crate, e.g. I/O.
pub type FireEventResult<T> = Result<T, Box<dyn Error>>;

/// Configuration errors.
///
/// These are programmer errors detected at call time, the computations themselves never fail.
#[derive(Debug, Clone, PartialEq)]
pub enum FireEventError {
    /// The clustering distance must be a finite, positive number of meters.
    InvalidEps(f64),
    /// The clustering minimum number of points must be at least 1.
    InvalidMinPoints(usize),
    /// A time window must end after it starts.
    InvalidTimeWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// A window or coverage extension was given a negative, zero, or out of range number of hours.
    InvalidHours(i64),
    /// Not one of 6h, 12h, 24h, 48h, or 7d.
    UnknownTimeRange(String),
    /// A CSV header was missing a required column.
    MissingColumn(&'static str),
    /// The CSV text could not be read at all.
    MalformedCsv(String),
}

impl Display for FireEventError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        use FireEventError::*;

        match self {
            InvalidEps(eps) => write!(f, "eps must be a positive number of meters: {}", eps),
            InvalidMinPoints(n) => write!(f, "minimum points must be at least 1: {}", n),
            InvalidTimeWindow { start, end } => {
                write!(f, "time window must end after it starts: {} to {}", start, end)
            }
            InvalidHours(hours) => write!(f, "invalid number of hours: {}", hours),
            UnknownTimeRange(token) => write!(
                f,
                "unknown time range '{}', expected one of 6h, 12h, 24h, 48h, 7d",
                token
            ),
            MissingColumn(col) => write!(f, "unexpected CSV, no '{}' column", col),
            MalformedCsv(msg) => write!(f, "malformed CSV: {}", msg),
        }
    }
}

impl Error for FireEventError {}
