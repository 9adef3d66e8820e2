/*!
 * All the data related to a single satellite hotspot detection.
 *
 * A Detection is a structure that holds the fields of a thermal anomaly record that the rest of
 * this crate actually uses. Anything else the source provided is carried along untouched in the
 * metadata map.
 */
use crate::geo::Coord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confidence label used when a detection does not have one.
pub const DEFAULT_CONFIDENCE: &str = "n";

/// Metadata key naming the feed a detection came from.
pub const SOURCE_KEY: &str = "source";

/**
 * Represents all the data associated with a single location in which a satellite detected a
 * thermal anomaly.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// The fire radiative power in megawatts, 0.0 if the source didn't have it.
    pub radiative_power: f64,
    /// A source defined confidence label, e.g. "l", "n", or "h".
    pub confidence: Option<String>,
    /// The time the satellite recorded the detection.
    ///
    /// Detections without a valid time are never selected by any of the time filters.
    pub acquired_at: Option<DateTime<Utc>>,
    /// Any other columns from the source record. Never inspected here.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Detection {
    /// Create a new detection with no confidence label or extra metadata.
    pub fn new(
        lat: f64,
        lon: f64,
        radiative_power: f64,
        acquired_at: Option<DateTime<Utc>>,
    ) -> Self {
        Detection {
            lat,
            lon,
            radiative_power,
            confidence: None,
            acquired_at,
            metadata: BTreeMap::new(),
        }
    }

    /// Builder style method to attach a confidence label.
    pub fn with_confidence<S: Into<String>>(mut self, confidence: S) -> Self {
        self.confidence = Some(confidence.into());
        self
    }

    /// The location of this detection.
    pub fn coord(&self) -> Coord {
        Coord {
            lat: self.lat,
            lon: self.lon,
        }
    }

    /// The confidence label, or the default label if there wasn't one.
    pub fn confidence_label(&self) -> &str {
        self.confidence.as_deref().unwrap_or(DEFAULT_CONFIDENCE)
    }

    /// Great circle distance from this detection to a coordinate in meters.
    pub fn distance_to(&self, coord: Coord) -> f64 {
        self.coord().distance_to(coord)
    }

    /// Record the feed this detection came from, replacing any source already in the metadata.
    pub fn set_source<S: Into<String>>(&mut self, source: S) {
        self.metadata.insert(SOURCE_KEY.to_owned(), source.into());
    }

    /// The feed this detection came from, if it was recorded.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}
