use crate::{
    cluster::{EventClusterer, DEFAULT_EPS_METERS, DEFAULT_MIN_POINTS},
    detection::Detection,
    error::FireEventError,
    event::{aggregate_events, FireEvent},
    time_range::{
        coverage_extension, select_with_coverage, select_within_range, TimeRange, TimeWindow,
        DEFAULT_COVERAGE_EXTENSION_HOURS,
    },
    trend::{Trend, TrendClassifier},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Parameters for a run of the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Clustering neighborhood radius, also used as the event radius for trends.
    pub eps_meters: f64,
    /// Clustering minimum number of neighbors.
    pub min_points: usize,
    /// Hours before and after a detection it is considered representative of, only used when
    /// selecting detections with [DetectionSelection::Coverage].
    pub coverage_extension_hours: i64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            eps_meters: DEFAULT_EPS_METERS,
            min_points: DEFAULT_MIN_POINTS,
            coverage_extension_hours: DEFAULT_COVERAGE_EXTENSION_HOURS,
        }
    }
}

impl AnalysisOptions {
    /// Check the options and build the clusterer, classifier, and coverage extension they
    /// describe.
    fn build(&self) -> Result<(EventClusterer, TrendClassifier, Duration), FireEventError> {
        let extension = coverage_extension(self.coverage_extension_hours)?;
        let clusterer = EventClusterer::new(self.eps_meters, self.min_points)?;
        let classifier = TrendClassifier::new(clusterer.eps_meters())?;

        Ok((clusterer, classifier, extension))
    }
}

/// How to pick the detections that get clustered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSelection {
    /// Everything in the range ending at the reference time.
    Range(TimeRange),
    /// Everything whose coverage intersects the window. Trends are still computed over the range
    /// ending at the reference time.
    Coverage { window: TimeWindow, range: TimeRange },
}

impl DetectionSelection {
    /// The range used for trend comparisons.
    pub fn range(&self) -> TimeRange {
        match self {
            DetectionSelection::Range(range) => *range,
            DetectionSelection::Coverage { range, .. } => *range,
        }
    }
}

/**
 * Fire events and the detections they were found in.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReport {
    /// The reference time of the analysis.
    pub now: DateTime<Utc>,
    /// The range used for the trend comparison.
    pub range: TimeRange,
    /// The classified events, in discovery order.
    pub events: Vec<FireEvent>,
    /// The detections that were selected for clustering.
    pub detections: Vec<Detection>,
}

impl EventReport {
    /**
     * Run the whole analysis: select, cluster, aggregate, and classify.
     *
     * #Arguments
     * detections - every available detection, those without a time are ignored.
     * now - the reference time, usually the current time.
     * selection - which detections to cluster and the range to compare trends over.
     * options - clustering parameters.
     */
    pub fn analyze(
        detections: &[Detection],
        now: DateTime<Utc>,
        selection: DetectionSelection,
        options: &AnalysisOptions,
    ) -> Result<Self, FireEventError> {
        let (clusterer, classifier, extension) = options.build()?;
        let range = selection.range();

        let selected = match selection {
            DetectionSelection::Range(range) => select_within_range(detections, now, range),
            DetectionSelection::Coverage { window, .. } => {
                select_with_coverage(detections, &window, extension)
            }
        };

        let clusters = clusterer.cluster(&selected);
        let mut events = aggregate_events(&selected, &clusters);
        classifier.classify_events(&mut events, detections, now, range);

        log::debug!(
            "{} of {} detections selected, {} events",
            selected.len(),
            detections.len(),
            events.len()
        );

        Ok(EventReport {
            now,
            range,
            events,
            detections: selected,
        })
    }

    /// Number of events with the given trend.
    pub fn count_trend(&self, trend: Trend) -> usize {
        self.events
            .iter()
            .filter(|e| e.trend.as_ref().map(|a| a.trend) == Some(trend))
            .count()
    }

    /// The event with the most total radiative power.
    pub fn most_powerful(&self) -> Option<&FireEvent> {
        self.events
            .iter()
            .max_by(|a, b| a.frp_sum.total_cmp(&b.frp_sum))
    }
}

impl Display for EventReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "      Reference: {}", self.now)?;
        writeln!(f, "     Time Range: {}", self.range)?;
        writeln!(f, " Current Period: last {}", self.range.current_period_label())?;
        writeln!(f, "     Detections: {}", self.detections.len())?;
        writeln!(f, "         Events: {}", self.events.len())?;
        writeln!(f)?;

        for event in &self.events {
            writeln!(f, "{}", event)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap()
    }

    fn group(lat: f64, lon: f64, count: usize, frp: f64, hours_ago: i64) -> Vec<Detection> {
        (0..count)
            .map(|i| {
                Detection::new(
                    lat + 0.001 * i as f64,
                    lon,
                    frp,
                    Some(now() - Duration::hours(hours_ago)),
                )
            })
            .collect()
    }

    #[test]
    fn test_invalid_options() {
        let options = AnalysisOptions {
            eps_meters: -1.0,
            ..AnalysisOptions::default()
        };
        let result = EventReport::analyze(
            &[],
            now(),
            DetectionSelection::Range(TimeRange::Hours24),
            &options,
        );
        assert_eq!(result, Err(FireEventError::InvalidEps(-1.0)));

        let options = AnalysisOptions {
            coverage_extension_hours: -2,
            ..AnalysisOptions::default()
        };
        let result = EventReport::analyze(
            &[],
            now(),
            DetectionSelection::Range(TimeRange::Hours24),
            &options,
        );
        assert_eq!(result, Err(FireEventError::InvalidHours(-2)));

        let options = AnalysisOptions {
            coverage_extension_hours: i64::MAX / 1000,
            ..AnalysisOptions::default()
        };
        let window = TimeWindow::ending_at(now(), 3).unwrap();
        let result = EventReport::analyze(
            &[],
            now(),
            DetectionSelection::Coverage {
                window,
                range: TimeRange::Hours24,
            },
            &options,
        );
        assert_eq!(result, Err(FireEventError::InvalidHours(i64::MAX / 1000)));
    }

    #[test]
    fn test_range_selection_drops_old_and_untimed() {
        let mut detections = group(-42.0, -71.0, 5, 10.0, 1);
        detections.extend(group(-43.0, -71.0, 5, 10.0, 30));
        detections.push(Detection::new(-42.0, -71.0, 10.0, None));

        let report = EventReport::analyze(
            &detections,
            now(),
            DetectionSelection::Range(TimeRange::Hours24),
            &AnalysisOptions::default(),
        )
        .unwrap();

        assert_eq!(report.detections.len(), 5);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.count_trend(Trend::Growing), 1);
        assert_eq!(report.most_powerful().map(|e| e.id.as_str()), Some("event-1"));
    }

    #[test]
    fn test_coverage_selection() {
        let detections = group(-42.0, -71.0, 5, 10.0, 20);

        // Window ended 15 hours ago, the detections 20 hours ago still cover it.
        let window = TimeWindow::ending_at(now() - Duration::hours(15), 3).unwrap();
        let selection = DetectionSelection::Coverage {
            window,
            range: TimeRange::Hours48,
        };
        let report =
            EventReport::analyze(&detections, now(), selection, &AnalysisOptions::default())
                .unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.range, TimeRange::Hours48);

        // Window ended 10 hours ago, the coverage ended 14 hours ago.
        let window = TimeWindow::ending_at(now() - Duration::hours(10), 3).unwrap();
        let selection = DetectionSelection::Coverage {
            window,
            range: TimeRange::Hours48,
        };
        let report =
            EventReport::analyze(&detections, now(), selection, &AnalysisOptions::default())
                .unwrap();
        assert!(report.events.is_empty());
        assert!(report.detections.is_empty());
    }
}
