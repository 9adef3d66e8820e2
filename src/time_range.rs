/*!
 * Selecting detections by acquisition time.
 *
 * Every function here takes the reference time as an argument instead of reading the clock, so
 * the results only depend on the inputs. Detections without an acquisition time are never
 * selected.
 */
use crate::{detection::Detection, error::FireEventError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Default number of hours a single detection is considered representative of, before and after
/// its acquisition time.
pub const DEFAULT_COVERAGE_EXTENSION_HOURS: i64 = 6;

/** The named time ranges a user can select. */
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum TimeRange {
    #[strum(serialize = "6h")]
    #[serde(rename = "6h")]
    Hours6,
    #[strum(serialize = "12h")]
    #[serde(rename = "12h")]
    Hours12,
    #[strum(serialize = "24h")]
    #[serde(rename = "24h")]
    Hours24,
    #[strum(serialize = "48h")]
    #[serde(rename = "48h")]
    Hours48,
    #[strum(serialize = "7d")]
    #[serde(rename = "7d")]
    Days7,
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Hours24
    }
}

impl TimeRange {
    /// Parse a range token, e.g. "24h".
    pub fn parse(token: &str) -> Result<Self, FireEventError> {
        token
            .trim()
            .parse()
            .map_err(|_| FireEventError::UnknownTimeRange(token.to_owned()))
    }

    /// The total length of the range.
    pub fn duration(&self) -> Duration {
        use TimeRange::*;

        match self {
            Hours6 => Duration::hours(6),
            Hours12 => Duration::hours(12),
            Hours24 => Duration::hours(24),
            Hours48 => Duration::hours(48),
            Days7 => Duration::days(7),
        }
    }

    /// Half of the range, the length of both the current and previous comparison periods.
    pub fn half_duration(&self) -> Duration {
        self.duration() / 2
    }

    /// Ranges of 48 hours or more.
    pub fn is_long(&self) -> bool {
        self.duration() >= Duration::hours(48)
    }

    /// Ranges of 24 hours or less.
    pub fn is_short(&self) -> bool {
        self.duration() <= Duration::hours(24)
    }

    /// A short label for the recent half of the range.
    pub fn current_period_label(&self) -> &'static str {
        use TimeRange::*;

        match self {
            Hours6 => "3h",
            Hours12 => "6h",
            Hours24 => "12h",
            Hours48 => "24h",
            Days7 => "3.5d",
        }
    }

    /// The number of days of upstream data that must be requested to cover this range.
    ///
    /// The upstream service serves at most 5 days, so the 7 day range is truncated.
    pub fn days_for_upstream(&self) -> u32 {
        use TimeRange::*;

        match self {
            Hours6 | Hours12 | Hours24 => 1,
            Hours48 => 2,
            Days7 => 5,
        }
    }
}

/** A span of time. The end is always after the start. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a new window, fails if `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, FireEventError> {
        if end <= start {
            return Err(FireEventError::InvalidTimeWindow { start, end });
        }

        Ok(TimeWindow { start, end })
    }

    /// Create a window of `hours` length that ends at `end`.
    pub fn ending_at(end: DateTime<Utc>, hours: i64) -> Result<Self, FireEventError> {
        if hours <= 0 {
            return Err(FireEventError::InvalidHours(hours));
        }

        let start = Duration::try_hours(hours)
            .and_then(|length| end.checked_sub_signed(length))
            .ok_or(FireEventError::InvalidHours(hours))?;

        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Is the time in the closed interval [start, end]?
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time <= self.end
    }

    /// Does the closed interval [start, end] intersect this window?
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        end >= self.start && start <= self.end
    }
}

/// Keep the detections with a timestamp that passes the test.
fn select_by_time<F>(detections: &[Detection], test: F) -> Vec<Detection>
where
    F: Fn(DateTime<Utc>) -> bool,
{
    detections
        .iter()
        .filter(|d| d.acquired_at.map(&test).unwrap_or(false))
        .cloned()
        .collect()
}

/// Keep detections acquired at or after `now - range`.
pub fn select_within_range(
    detections: &[Detection],
    now: DateTime<Utc>,
    range: TimeRange,
) -> Vec<Detection> {
    let cutoff = now - range.duration();
    select_by_time(detections, |t| t >= cutoff)
}

/// Keep detections in the older half of the range, `[now - range, now - range / 2)`.
pub fn select_previous_half(
    detections: &[Detection],
    now: DateTime<Utc>,
    range: TimeRange,
) -> Vec<Detection> {
    let cutoff_start = now - range.duration();
    let cutoff_end = now - range.half_duration();
    select_by_time(detections, |t| t >= cutoff_start && t < cutoff_end)
}

/// Keep detections in the newer half of the range, acquired at or after `now - range / 2`.
pub fn select_current_half(
    detections: &[Detection],
    now: DateTime<Utc>,
    range: TimeRange,
) -> Vec<Detection> {
    let cutoff = now - range.half_duration();
    select_by_time(detections, |t| t >= cutoff)
}

/// Keep detections acquired at or before `time`.
pub fn select_up_to(detections: &[Detection], time: DateTime<Utc>) -> Vec<Detection> {
    select_by_time(detections, |t| t <= time)
}

/// Keep detections acquired inside the closed window.
pub fn select_in_window(detections: &[Detection], window: &TimeWindow) -> Vec<Detection> {
    select_by_time(detections, |t| window.contains(t))
}

/**
 * The coverage extension for a number of hours.
 *
 * #Errors
 * Fails if `hours` is negative or too large to represent.
 */
pub fn coverage_extension(hours: i64) -> Result<Duration, FireEventError> {
    if hours < 0 {
        return Err(FireEventError::InvalidHours(hours));
    }

    Duration::try_hours(hours).ok_or(FireEventError::InvalidHours(hours))
}

/**
 * Keep detections whose coverage intersects the window.
 *
 * A single satellite pass is taken to represent conditions for `extension` before and after the
 * acquisition time, so the coverage of a detection at `t` is `[t - extension, t + extension]`.
 */
pub fn select_with_coverage(
    detections: &[Detection],
    window: &TimeWindow,
    extension: Duration,
) -> Vec<Detection> {
    select_by_time(detections, |t| {
        // Coverage running past the representable range of times is unbounded on that side.
        let start = t.checked_sub_signed(extension).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = t.checked_add_signed(extension).unwrap_or(DateTime::<Utc>::MAX_UTC);
        window.intersects(start, end)
    })
}

/**
 * Keep detections whose coverage intersects the window of `window_hours` ending at `end`.
 *
 * #Errors
 * Fails if `window_hours` is not positive, `extension_hours` is negative, or either is too large
 * to represent.
 */
pub fn select_with_coverage_extension(
    detections: &[Detection],
    end: DateTime<Utc>,
    window_hours: i64,
    extension_hours: i64,
) -> Result<Vec<Detection>, FireEventError> {
    let extension = coverage_extension(extension_hours)?;
    let window = TimeWindow::ending_at(end, window_hours)?;
    Ok(select_with_coverage(detections, &window, extension))
}
