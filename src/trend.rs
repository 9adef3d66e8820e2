/*!
 * Classify the recent activity of fire events.
 *
 * The detections near an event are split into two periods, the newer half and the older half of
 * the selected time range, and the activity in each is compared.
 */
use crate::{
    cluster::DEFAULT_EPS_METERS,
    detection::Detection,
    error::FireEventError,
    event::FireEvent,
    time_range::{select_current_half, select_previous_half, TimeRange},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Previous activity at or above any of these is significant.
const SIGNIFICANT_COUNT: usize = 10;
const SIGNIFICANT_FRP: f64 = 100.0;
const SIGNIFICANT_TOTAL_COUNT: usize = 50;

/// Previous activity at or above any of these is very significant.
const VERY_SIGNIFICANT_COUNT: usize = 50;
const VERY_SIGNIFICANT_FRP: f64 = 500.0;
const VERY_SIGNIFICANT_TOTAL_COUNT: usize = 100;

/// Ratio used in place of a division by zero, it reads as a doubling of activity.
const ZERO_DENOMINATOR_RATIO: f64 = 2.0;

const GROWTH_FACTOR: f64 = 1.5;
const DECLINE_FACTOR: f64 = 0.5;

/** The activity trend of a fire event. */
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
pub enum Trend {
    /// More activity recently than before.
    #[strum(serialize = "creciente")]
    #[serde(rename = "creciente")]
    Growing,
    /// Less activity recently than before.
    #[strum(serialize = "decreciente")]
    #[serde(rename = "decreciente")]
    Shrinking,
    #[strum(serialize = "estable")]
    #[serde(rename = "estable")]
    Stable,
    /// Significant activity before and none recently.
    #[strum(serialize = "extinto")]
    #[serde(rename = "extinto")]
    Extinguished,
}

/// The values a trend is decided from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendInputs {
    /// Number of detections near the event in the newer half of the range.
    pub current_count: usize,
    /// Number of detections near the event in the older half of the range.
    pub previous_count: usize,
    /// Total radiative power in the newer half, megawatts.
    pub current_frp: f64,
    /// Total radiative power in the older half, megawatts.
    pub previous_frp: f64,
    /// The number of detections in the event, a proxy for how big the fire is.
    pub total_event_count: usize,
    /// The selected range is 48 hours or longer.
    pub is_long_range: bool,
    /// The selected range is 24 hours or shorter.
    pub is_short_range: bool,
    /// Hours from the last detection in the event until the reference time.
    pub hours_since_last_seen: Option<f64>,
    /// The fraction of activity expected in the newer half for the selected range.
    pub expected_ratio: f64,
}

/// The result of classifying an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAssessment {
    pub trend: Trend,
    /// A human readable justification that includes the values compared.
    pub reason: String,
    pub current_count: usize,
    pub previous_count: usize,
    pub current_frp: f64,
    pub previous_frp: f64,
    pub hours_since_last_seen: Option<f64>,
}

/**
 * The ratio of recent to older activity expected for a steady fire.
 *
 * Wider ranges expect a smaller recent share.
 */
pub fn expected_recent_ratio(range: TimeRange) -> f64 {
    if range.is_short() {
        0.5
    } else if range == TimeRange::Days7 {
        0.1
    } else {
        0.25
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        ZERO_DENOMINATOR_RATIO
    } else {
        numerator / denominator
    }
}

impl TrendInputs {
    fn previous_is_significant(&self) -> bool {
        self.previous_count >= SIGNIFICANT_COUNT
            || self.previous_frp >= SIGNIFICANT_FRP
            || self.total_event_count >= SIGNIFICANT_TOTAL_COUNT
    }

    fn previous_is_very_significant(&self) -> bool {
        self.previous_count >= VERY_SIGNIFICANT_COUNT
            || self.previous_frp >= VERY_SIGNIFICANT_FRP
            || self.total_event_count >= VERY_SIGNIFICANT_TOTAL_COUNT
    }

    /// The average of the count ratio and the radiative power ratio.
    pub fn combined_ratio(&self) -> f64 {
        let count_ratio = ratio(self.current_count as f64, self.previous_count as f64);
        let frp_ratio = ratio(self.current_frp, self.previous_frp);
        (count_ratio + frp_ratio) / 2.0
    }

    /**
     * Decide the trend.
     *
     * The rules overlap, so the first one that matches wins.
     */
    pub fn classify(&self) -> TrendAssessment {
        let (trend, reason) = self.decide();

        let reason = match self.hours_since_last_seen {
            Some(hours) => format!("{} (last seen {:.1} h ago)", reason, hours),
            None => reason,
        };

        TrendAssessment {
            trend,
            reason,
            current_count: self.current_count,
            previous_count: self.previous_count,
            current_frp: self.current_frp,
            previous_frp: self.previous_frp,
            hours_since_last_seen: self.hours_since_last_seen,
        }
    }

    fn decide(&self) -> (Trend, String) {
        let current_active = self.current_count > 0 || self.current_frp > 0.0;
        let previous_active = self.previous_count > 0 || self.previous_frp > 0.0;

        if !current_active && !previous_active {
            return (
                Trend::Stable,
                "no activity in either the current or the previous period".to_owned(),
            );
        }

        if !previous_active {
            return (
                Trend::Growing,
                format!(
                    "new activity: {} detections and {:.1} MW in the current period, none before",
                    self.current_count, self.current_frp
                ),
            );
        }

        if !current_active {
            let previous = format!(
                "{} detections and {:.1} MW in the previous period, {} in the event",
                self.previous_count, self.previous_frp, self.total_event_count
            );

            if !self.previous_is_significant() {
                return (
                    Trend::Shrinking,
                    format!("no current activity after minor activity: {}", previous),
                );
            }

            if self.is_long_range || self.previous_is_very_significant() {
                return (
                    Trend::Extinguished,
                    format!("no current activity after significant activity: {}", previous),
                );
            }

            return (
                Trend::Shrinking,
                format!("no current activity after significant activity: {}", previous),
            );
        }

        let combined = self.combined_ratio();
        let range_kind = if self.is_short_range {
            "short"
        } else if self.is_long_range {
            "long"
        } else {
            "medium"
        };
        let comparison = format!(
            "{} vs {} detections, {:.1} vs {:.1} MW, combined ratio {:.2} \
             (expected {:.2} for a {} range)",
            self.current_count,
            self.previous_count,
            self.current_frp,
            self.previous_frp,
            combined,
            self.expected_ratio,
            range_kind
        );

        if combined > GROWTH_FACTOR * self.expected_ratio {
            (Trend::Growing, format!("activity increasing: {}", comparison))
        } else if combined < DECLINE_FACTOR * self.expected_ratio && self.previous_is_significant()
        {
            (Trend::Shrinking, format!("activity decreasing: {}", comparison))
        } else {
            (Trend::Stable, format!("activity steady: {}", comparison))
        }
    }
}

/**
 * Classifies fire events by comparing the activity around them in the two halves of a time range.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendClassifier {
    event_radius_meters: f64,
}

impl Default for TrendClassifier {
    fn default() -> Self {
        TrendClassifier {
            event_radius_meters: DEFAULT_EPS_METERS,
        }
    }
}

impl TrendClassifier {
    /// Create a classifier counting detections within `event_radius_meters` of an event centroid.
    ///
    /// This should be the same distance used for clustering, and like it must be positive.
    pub fn new(event_radius_meters: f64) -> Result<Self, FireEventError> {
        if !event_radius_meters.is_finite() || event_radius_meters <= 0.0 {
            return Err(FireEventError::InvalidEps(event_radius_meters));
        }

        Ok(TrendClassifier {
            event_radius_meters,
        })
    }

    pub fn event_radius_meters(&self) -> f64 {
        self.event_radius_meters
    }

    /// Gather the inputs for a single event.
    pub fn inputs_for(
        &self,
        event: &FireEvent,
        current: &[Detection],
        previous: &[Detection],
        now: DateTime<Utc>,
        range: TimeRange,
    ) -> TrendInputs {
        let near = |d: &&Detection| d.distance_to(event.centroid) <= self.event_radius_meters;

        let (current_count, current_frp) = current
            .iter()
            .filter(near)
            .fold((0, 0.0), |(n, frp), d| (n + 1, frp + d.radiative_power));
        let (previous_count, previous_frp) = previous
            .iter()
            .filter(near)
            .fold((0, 0.0), |(n, frp), d| (n + 1, frp + d.radiative_power));

        let hours_since_last_seen = event
            .last_seen
            .map(|last_seen| (now - last_seen).num_seconds() as f64 / 3600.0);

        TrendInputs {
            current_count,
            previous_count,
            current_frp,
            previous_frp,
            total_event_count: event.count,
            is_long_range: range.is_long(),
            is_short_range: range.is_short(),
            hours_since_last_seen,
            expected_ratio: expected_recent_ratio(range),
        }
    }

    /**
     * Classify every event.
     *
     * #Arguments
     * events - the events to classify, their `trend` is overwritten.
     * detections - all available detections, not just the ones in the events.
     * now - the reference time the range ends at.
     * range - the selected time range.
     */
    pub fn classify_events(
        &self,
        events: &mut [FireEvent],
        detections: &[Detection],
        now: DateTime<Utc>,
        range: TimeRange,
    ) {
        let current = select_current_half(detections, now, range);
        let previous = select_previous_half(detections, now, range);

        for event in events.iter_mut() {
            let inputs = self.inputs_for(event, &current, &previous, now, range);
            let assessment = inputs.classify();
            log::debug!("{} is {}: {}", event.id, assessment.trend, assessment.reason);
            event.trend = Some(assessment);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration, TimeZone};
    use strum::IntoEnumIterator;

    fn inputs(
        current_count: usize,
        previous_count: usize,
        current_frp: f64,
        previous_frp: f64,
        range: TimeRange,
    ) -> TrendInputs {
        TrendInputs {
            current_count,
            previous_count,
            current_frp,
            previous_frp,
            total_event_count: current_count + previous_count,
            is_long_range: range.is_long(),
            is_short_range: range.is_short(),
            hours_since_last_seen: None,
            expected_ratio: expected_recent_ratio(range),
        }
    }

    #[test]
    fn test_no_activity_is_stable() {
        let assessment = inputs(0, 0, 0.0, 0.0, TimeRange::Hours24).classify();
        assert_eq!(assessment.trend, Trend::Stable);
    }

    #[test]
    fn test_new_activity_is_growing() {
        let assessment = inputs(5, 0, 50.0, 0.0, TimeRange::Hours24).classify();
        assert_eq!(assessment.trend, Trend::Growing);
        assert!(assessment.reason.contains('5'));
        assert!(assessment.reason.contains("50.0"));
    }

    #[test]
    fn test_significant_previous_activity_long_range_is_extinguished() {
        let assessment = inputs(0, 20, 0.0, 200.0, TimeRange::Days7).classify();
        assert_eq!(assessment.trend, Trend::Extinguished);
        assert!(assessment.reason.contains("20"));
        assert!(assessment.reason.contains("200.0"));
    }

    #[test]
    fn test_significant_previous_activity_short_range() {
        let assessment = inputs(0, 20, 0.0, 200.0, TimeRange::Hours12).classify();
        assert_eq!(assessment.trend, Trend::Shrinking);

        // Very significant is extinguished regardless of the range.
        let assessment = inputs(0, 20, 0.0, 600.0, TimeRange::Hours12).classify();
        assert_eq!(assessment.trend, Trend::Extinguished);

        let mut big_event = inputs(0, 3, 0.0, 10.0, TimeRange::Hours6);
        big_event.total_event_count = 120;
        assert_eq!(big_event.classify().trend, Trend::Extinguished);
    }

    #[test]
    fn test_minor_previous_activity_is_shrinking() {
        let assessment = inputs(0, 3, 0.0, 12.0, TimeRange::Days7).classify();
        assert_eq!(assessment.trend, Trend::Shrinking);
    }

    #[test]
    fn test_both_active() {
        // Expected ratio for short ranges is 0.5, growth above 0.75.
        let assessment = inputs(10, 10, 100.0, 100.0, TimeRange::Hours24).classify();
        assert_eq!(assessment.trend, Trend::Growing);

        // 0.5 for both ratios is in the stable band [0.25, 0.75].
        let assessment = inputs(5, 10, 50.0, 100.0, TimeRange::Hours24).classify();
        assert_eq!(assessment.trend, Trend::Stable);

        // Below 0.25 with a significant previous period.
        let assessment = inputs(1, 20, 10.0, 200.0, TimeRange::Hours24).classify();
        assert_eq!(assessment.trend, Trend::Shrinking);

        // Below 0.25 without a significant previous period.
        let assessment = inputs(1, 8, 1.0, 40.0, TimeRange::Hours24).classify();
        assert_eq!(assessment.trend, Trend::Stable);

        // The 7 day range expects 0.1, so 0.1 is steady.
        let assessment = inputs(2, 20, 20.0, 200.0, TimeRange::Days7).classify();
        assert_eq!(assessment.trend, Trend::Stable);
    }

    #[test]
    fn test_zero_frp_denominator_reads_as_doubling() {
        let input = inputs(4, 4, 10.0, 0.0, TimeRange::Hours48);
        assert!((input.combined_ratio() - 1.5).abs() < 1.0e-12);
        assert_eq!(input.classify().trend, Trend::Growing);
    }

    #[test]
    fn test_totality_and_idempotence() {
        let counts = [0, 1, 10, 50, 100];
        let powers = [0.0, 1.0, 100.0, 500.0];

        for range in TimeRange::iter() {
            for &cc in &counts {
                for &pc in &counts {
                    for &cf in &powers {
                        for &pf in &powers {
                            let input = inputs(cc, pc, cf, pf, range);
                            let first = input.classify();
                            assert!(Trend::iter().any(|t| t == first.trend));
                            assert_eq!(input.classify(), first);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_reason_includes_last_seen() {
        let mut input = inputs(5, 0, 50.0, 0.0, TimeRange::Hours24);
        input.hours_since_last_seen = Some(2.5);
        assert!(input.classify().reason.contains("2.5 h"));
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(Trend::Growing.to_string(), "creciente");
        assert_eq!(Trend::Shrinking.to_string(), "decreciente");
        assert_eq!(Trend::Stable.to_string(), "estable");
        assert_eq!(Trend::Extinguished.to_string(), "extinto");
        assert_eq!("extinto".parse::<Trend>().unwrap(), Trend::Extinguished);
    }

    #[test]
    fn test_invalid_event_radius() {
        assert_eq!(TrendClassifier::new(-1.0), Err(FireEventError::InvalidEps(-1.0)));
        assert_eq!(TrendClassifier::new(0.0), Err(FireEventError::InvalidEps(0.0)));
        assert!(matches!(
            TrendClassifier::new(f64::NAN),
            Err(FireEventError::InvalidEps(eps)) if eps.is_nan()
        ));
        assert!(TrendClassifier::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_classify_recent_event() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let detections: Vec<Detection> = (0..5)
            .map(|i| {
                let lat = -42.0 + 0.001 * i as f64;
                Detection::new(lat, -71.0, 10.0, Some(now - Duration::hours(1)))
            })
            .collect();

        let event = FireEvent::from_detections("event-1".to_owned(), detections.clone()).unwrap();
        let mut events = vec![event];

        let classifier = TrendClassifier::new(1500.0).unwrap();
        classifier.classify_events(&mut events, &detections, now, TimeRange::Hours24);

        let assessment = events[0].trend.as_ref().unwrap();
        assert_eq!(assessment.trend, Trend::Growing);
        assert_eq!(assessment.current_count, 5);
        assert_eq!(assessment.previous_count, 0);
    }
}
