/*!
 * Geographic calculations.
 *
 * Everything here uses a spherical Earth model. The errors this introduces are negligible at the
 * scale of a single fire event (a few kilometers).
 */
use serde::{Deserialize, Serialize};

/// Mean radius of the Earth in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude and longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    /// Great circle distance to another coordinate in meters.
    pub fn distance_to(&self, other: Coord) -> f64 {
        distance_meters(self.lat, self.lon, other.lat, other.lon)
    }

    /// Determine if these coordinates are within `eps` degrees of each other in both latitude and
    /// longitude.
    pub fn is_close(&self, other: Coord, eps: f64) -> bool {
        (self.lat - other.lat).abs() <= eps && (self.lon - other.lon).abs() <= eps
    }
}

/**
 * The haversine great circle distance calculation.
 *
 * #Arguments
 * * lat1 - the latitude of the first point in degrees.
 * * lon1 - the longitude of the first point in degrees.
 * * lat2 - the latitude of the second point in degrees.
 * * lon2 - the longitude of the second point in degrees.
 *
 * #Returns
 * The distance between the points in meters. NaN inputs produce a NaN output.
 */
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let dlat2 = (lat2 - lat1).to_radians() / 2.0;
    let dlon2 = (lon2 - lon1).to_radians() / 2.0;

    let sin2_dlat = f64::powi(f64::sin(dlat2), 2);
    let sin2_dlon = f64::powi(f64::sin(dlon2), 2);

    let a = sin2_dlat + sin2_dlon * f64::cos(lat1_r) * f64::cos(lat2_r);
    // Rounding can push near antipodal points just past 1. Comparing keeps NaN.
    let a = if a > 1.0 { 1.0 } else { a };
    let arc = 2.0 * f64::atan2(f64::sqrt(a), f64::sqrt(1.0 - a));

    arc * EARTH_RADIUS_M
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_distance_identity_and_symmetry() {
        let points = [
            Coord { lat: -42.7, lon: -71.3 },
            Coord { lat: 45.5, lon: -120.0 },
            Coord { lat: 0.0, lon: 179.9 },
            Coord { lat: 89.0, lon: 10.0 },
        ];

        for a in &points {
            assert_eq!(a.distance_to(*a), 0.0);
            for b in &points {
                assert_eq!(a.distance_to(*b), b.distance_to(*a));
            }
        }
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // One degree along a meridian is R * pi / 180.
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        let dist = distance_meters(10.0, 20.0, 11.0, 20.0);
        assert!((dist - expected).abs() < 1.0e-6);

        // Crossing the anti-meridian is a short hop, not half way around the world.
        let dist = distance_meters(0.0, 179.5, 0.0, -179.5);
        assert!((dist - expected).abs() < 1.0e-6);
    }

    #[test]
    fn test_triangle_inequality() {
        let a = Coord { lat: -42.0, lon: -71.0 };
        let b = Coord { lat: -42.3, lon: -71.4 };
        let c = Coord { lat: -41.8, lon: -71.9 };

        assert!(a.distance_to(c) <= a.distance_to(b) + b.distance_to(c) + 1.0e-6);
    }

    #[test]
    fn test_antipodal_points() {
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_M;

        for (lat, lon) in [(0.0, 0.0), (45.0, 10.0), (-33.3, 151.2), (89.9, -179.9)] {
            let anti_lon = if lon > 0.0 { lon - 180.0 } else { lon + 180.0 };
            let d = distance_meters(lat, lon, -lat, anti_lon);
            assert!(d.is_finite());
            assert!((d - half_circumference).abs() < 1.0, "{} {}: {}", lat, lon, d);
        }
    }

    #[test]
    fn test_nan_propagates() {
        assert!(distance_meters(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }
}
