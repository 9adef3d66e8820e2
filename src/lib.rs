/*!
 * Group satellite hotspot detections into fire events and classify how their activity is trending.
 *
 * The analysis is a pure function of the detections, a reference time, and a time range. Nothing
 * is cached between calls, so independent analyses can run on different threads at the same
 * time.
 */
pub use cluster::{EventClusterer, DEFAULT_EPS_METERS, DEFAULT_MIN_POINTS};
pub use detection::{Detection, DEFAULT_CONFIDENCE, SOURCE_KEY};
pub use error::{FireEventError, FireEventResult};
pub use event::{aggregate_events, event_id, FireEvent};
pub use firms::{parse_acquisition_time, parse_csv, read_csv_file};
pub use geo::{distance_meters, Coord, EARTH_RADIUS_M};
pub use report::{AnalysisOptions, DetectionSelection, EventReport};
pub use time_range::{
    coverage_extension, select_current_half, select_in_window, select_previous_half, select_up_to,
    select_with_coverage, select_with_coverage_extension, select_within_range, TimeRange,
    TimeWindow, DEFAULT_COVERAGE_EXTENSION_HOURS,
};
pub use trend::{expected_recent_ratio, Trend, TrendAssessment, TrendClassifier, TrendInputs};

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod cluster;
mod detection;
mod error;
mod event;
mod firms;
mod geo;
mod report;
mod time_range;
mod trend;

static_assertions::assert_impl_all!(Detection: Send, Sync);
static_assertions::assert_impl_all!(FireEvent: Send, Sync);
static_assertions::assert_impl_all!(EventReport: Send, Sync);
static_assertions::assert_impl_all!(EventClusterer: Send, Sync, Copy);
static_assertions::assert_impl_all!(TrendClassifier: Send, Sync, Copy);
