use crate::{detection::Detection, geo::Coord, trend::TrendAssessment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

/**
 * The aggregate properties of a spatially connected group of [Detection] objects.
 *
 * A fire event only lives for a single clustering run. The id is an ordinal within that run and
 * there is no attempt to match events between runs, so the same fire may get a different id the
 * next time the detections are clustered.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireEvent {
    /// The ordinal of this event within a single run, e.g. "event-3".
    pub id: String,
    /// The detections that make up this event.
    pub detections: Vec<Detection>,
    /// The radiative power weighted mean location of the detections.
    pub centroid: Coord,
    /// The number of detections.
    pub count: usize,
    /// Total (sum) of the radiative power of the detections in megawatts.
    pub frp_sum: f64,
    /// Mean radiative power of the detections in megawatts.
    pub frp_avg: f64,
    /// Number of detections with each confidence label.
    pub confidence_counts: BTreeMap<String, usize>,
    /// The most recent acquisition time of any detection in the event.
    pub last_seen: Option<DateTime<Utc>>,
    /// The activity trend, not available until the event has been classified.
    pub trend: Option<TrendAssessment>,
}

impl Display for FireEvent {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "             ID: {}", self.id)?;
        writeln!(f, "       Centroid: {:.6},{:.6}", self.centroid.lat, self.centroid.lon)?;
        writeln!(f, "     Detections: {}", self.count)?;
        writeln!(f, "      Total FRP: {:.1} MW", self.frp_sum)?;
        writeln!(f, "       Mean FRP: {:.1} MW", self.frp_avg)?;

        let confidence: Vec<String> = self
            .confidence_counts
            .iter()
            .map(|(label, count)| format!("{}={}", label, count))
            .collect();
        writeln!(f, "     Confidence: {}", confidence.join(" "))?;

        match self.last_seen {
            Some(last_seen) => writeln!(f, "      Last Seen: {}", last_seen)?,
            None => writeln!(f, "      Last Seen: unknown")?,
        }

        match &self.trend {
            Some(assessment) => {
                writeln!(f, "          Trend: {}", assessment.trend)?;
                writeln!(f, "         Reason: {}", assessment.reason)
            }
            None => writeln!(f, "          Trend: not classified"),
        }
    }
}

impl FireEvent {
    /**
     * Reduce a group of detections into an event.
     *
     * The centroid is weighted by radiative power. If none of the detections have any power, all
     * of them get the same weight.
     *
     * #Returns
     * `None` if `detections` is empty.
     */
    pub fn from_detections(id: String, detections: Vec<Detection>) -> Option<Self> {
        if detections.is_empty() {
            return None;
        }

        let count = detections.len();
        let frp_sum: f64 = detections.iter().map(|d| d.radiative_power).sum();
        let frp_avg = frp_sum / count as f64;

        let use_power = detections.iter().any(|d| d.radiative_power > 0.0);
        let weight = |d: &Detection| {
            if use_power {
                d.radiative_power.max(0.0)
            } else {
                1.0
            }
        };

        let (mut lat_sum, mut lon_sum, mut weight_sum) = (0.0, 0.0, 0.0);
        for d in &detections {
            let w = weight(d);
            lat_sum += d.lat * w;
            lon_sum += d.lon * w;
            weight_sum += w;
        }

        let centroid = Coord {
            lat: lat_sum / weight_sum,
            lon: lon_sum / weight_sum,
        };

        let mut confidence_counts = BTreeMap::new();
        for d in &detections {
            *confidence_counts
                .entry(d.confidence_label().to_owned())
                .or_insert(0) += 1;
        }

        let last_seen = detections.iter().filter_map(|d| d.acquired_at).max();

        Some(FireEvent {
            id,
            detections,
            centroid,
            count,
            frp_sum,
            frp_avg,
            confidence_counts,
            last_seen,
            trend: None,
        })
    }
}

/// The id token for the event discovered at `ordinal` (starting at 1) in a run.
pub fn event_id(ordinal: usize) -> String {
    format!("event-{}", ordinal)
}

/**
 * Turn clusters of detection indexes into fire events.
 *
 * #Arguments
 * detections - the detections that were clustered.
 * clusters - lists of indexes into `detections`, as produced by
 *            [EventClusterer::cluster](crate::EventClusterer::cluster).
 *
 * #Returns
 * One event per non-empty cluster, with ids assigned in cluster order.
 */
pub fn aggregate_events(detections: &[Detection], clusters: &[Vec<usize>]) -> Vec<FireEvent> {
    clusters
        .iter()
        .filter(|cluster| !cluster.is_empty())
        .enumerate()
        .filter_map(|(idx, cluster)| {
            let members = cluster.iter().map(|&i| detections[i].clone()).collect();
            FireEvent::from_detections(event_id(idx + 1), members)
        })
        .collect()
}
