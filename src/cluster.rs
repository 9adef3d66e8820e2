/*!
 * Group detections into clusters.
 *
 * Clustering is density based (DBSCAN) using the great circle distance between detections. A
 * cluster is only started from a detection with enough close neighbors, and then grows through
 * every neighbor that is itself dense enough. Sparse detections reached along the way are
 * included as border points but never grow the cluster further.
 */
use crate::{detection::Detection, error::FireEventError, geo};
use std::collections::VecDeque;

/// Default neighborhood radius in meters.
pub const DEFAULT_EPS_METERS: f64 = 1500.0;

/// Default number of neighbors required to start or grow a cluster.
pub const DEFAULT_MIN_POINTS: usize = 4;

/// Cluster membership of a single detection during a clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Unclassified,
    Noise,
    Cluster(usize),
}

/**
 * The parameters for density based clustering.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventClusterer {
    eps_meters: f64,
    min_points: usize,
}

impl Default for EventClusterer {
    fn default() -> Self {
        EventClusterer {
            eps_meters: DEFAULT_EPS_METERS,
            min_points: DEFAULT_MIN_POINTS,
        }
    }
}

impl EventClusterer {
    /**
     * Create a new clusterer.
     *
     * #Arguments
     * eps_meters - the radius of the neighborhood around a detection, must be positive.
     * min_points - the number of neighbors (not counting the detection itself) required for a
     *              detection to start or grow a cluster, must be at least 1.
     */
    pub fn new(eps_meters: f64, min_points: usize) -> Result<Self, FireEventError> {
        if !eps_meters.is_finite() || eps_meters <= 0.0 {
            return Err(FireEventError::InvalidEps(eps_meters));
        }

        if min_points < 1 {
            return Err(FireEventError::InvalidMinPoints(min_points));
        }

        Ok(EventClusterer {
            eps_meters,
            min_points,
        })
    }

    pub fn eps_meters(&self) -> f64 {
        self.eps_meters
    }

    pub fn min_points(&self) -> usize {
        self.min_points
    }

    /**
     * Group detections into clusters.
     *
     * Detections are visited in ascending index order, so the same input always produces the same
     * clusters in the same order.
     *
     * #Returns
     * A list of clusters, each one a list of indexes into `detections` in the order they were
     * discovered. Every cluster has at least `min_points` members.
     */
    pub fn cluster(&self, detections: &[Detection]) -> Vec<Vec<usize>> {
        let n = detections.len();

        let mut visited = vec![false; n];
        let mut membership = vec![Membership::Unclassified; n];
        // Which cluster expansion last queued each index, keeps the frontier free of duplicates.
        let mut queued_by: Vec<Option<usize>> = vec![None; n];

        let mut clusters: Vec<Vec<usize>> = vec![];
        let mut frontier: VecDeque<usize> = VecDeque::new();

        for seed in 0..n {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            let neighbors = self.neighbors(detections, seed);
            if neighbors.len() < self.min_points {
                membership[seed] = Membership::Noise;
                continue;
            }

            let cluster_id = clusters.len();
            let mut members = vec![seed];
            membership[seed] = Membership::Cluster(cluster_id);
            queued_by[seed] = Some(cluster_id);

            frontier.clear();
            enqueue(&mut frontier, &mut queued_by, cluster_id, &neighbors);

            while let Some(idx) = frontier.pop_front() {
                if !visited[idx] {
                    visited[idx] = true;

                    let next_neighbors = self.neighbors(detections, idx);
                    if next_neighbors.len() >= self.min_points {
                        enqueue(&mut frontier, &mut queued_by, cluster_id, &next_neighbors);
                    }
                }

                match membership[idx] {
                    Membership::Unclassified | Membership::Noise => {
                        membership[idx] = Membership::Cluster(cluster_id);
                        members.push(idx);
                    }
                    Membership::Cluster(_) => {}
                }
            }

            clusters.push(members);
        }

        let num_found = clusters.len();
        let clusters: Vec<_> = clusters
            .into_iter()
            .filter(|c| c.len() >= self.min_points)
            .collect();

        log::debug!(
            "clustered {} detections into {} clusters ({} dropped as too small), {} noise",
            n,
            clusters.len(),
            num_found - clusters.len(),
            membership
                .iter()
                .filter(|m| **m == Membership::Noise)
                .count()
        );

        clusters
    }

    /// Indexes of all the other detections within eps of the one at `idx`, in ascending order.
    fn neighbors(&self, detections: &[Detection], idx: usize) -> Vec<usize> {
        let center = &detections[idx];

        detections
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .filter(|(_, d)| {
                geo::distance_meters(center.lat, center.lon, d.lat, d.lon) <= self.eps_meters
            })
            .map(|(i, _)| i)
            .collect()
    }
}

fn enqueue(
    frontier: &mut VecDeque<usize>,
    queued_by: &mut [Option<usize>],
    cluster_id: usize,
    indexes: &[usize],
) {
    for &idx in indexes {
        if queued_by[idx] != Some(cluster_id) {
            queued_by[idx] = Some(cluster_id);
            frontier.push_back(idx);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Roughly 111 meters per 0.001 degrees of latitude.
    fn detection(lat: f64, lon: f64) -> Detection {
        Detection::new(lat, lon, 1.0, None)
    }

    fn tight_group(lat: f64, lon: f64, count: usize) -> Vec<Detection> {
        (0..count)
            .map(|i| detection(lat + 0.001 * i as f64, lon))
            .collect()
    }

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(
            EventClusterer::new(0.0, 4),
            Err(FireEventError::InvalidEps(0.0))
        );
        assert!(EventClusterer::new(-10.0, 4).is_err());
        assert!(EventClusterer::new(f64::NAN, 4).is_err());
        assert_eq!(
            EventClusterer::new(1500.0, 0),
            Err(FireEventError::InvalidMinPoints(0))
        );

        let clusterer = EventClusterer::new(1500.0, 1).unwrap();
        assert_eq!(clusterer.min_points(), 1);
        assert_eq!(EventClusterer::default().eps_meters(), DEFAULT_EPS_METERS);
    }

    #[test]
    fn test_empty_input() {
        assert!(EventClusterer::default().cluster(&[]).is_empty());
    }

    #[test]
    fn test_too_few_points_is_noise() {
        let detections = tight_group(-42.0, -71.0, 3);
        assert!(EventClusterer::default().cluster(&detections).is_empty());
    }

    #[test]
    fn test_separate_groups() {
        let mut detections = tight_group(-42.0, -71.0, 5);
        detections.extend(tight_group(-43.0, -71.0, 6));
        // A lone point far from everything.
        detections.push(detection(-44.0, -70.0));

        let clusters = EventClusterer::default().cluster(&detections);
        assert_eq!(clusters, vec![vec![0, 1, 2, 3, 4], vec![5, 6, 7, 8, 9, 10]]);
    }

    #[test]
    fn test_chain_expands_through_dense_points() {
        // A line of points 1 km apart. Each interior point has 2 neighbors within 1.5 km.
        let detections: Vec<_> = (0..8)
            .map(|i| detection(-42.0 + 0.009 * i as f64, -71.0))
            .collect();

        let clusterer = EventClusterer::new(1500.0, 2).unwrap();
        let clusters = clusterer.cluster(&detections);

        assert_eq!(clusters.len(), 1);
        let mut members = clusters[0].clone();
        members.sort_unstable();
        assert_eq!(members, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_noise_becomes_border_point() {
        // Index 0 is visited first and has only one neighbor, so it is noise at first. It is
        // later reached from the dense group and joins it as a border point.
        let mut detections = vec![detection(-42.0 - 0.012, -71.0)];
        detections.extend(tight_group(-42.0, -71.0, 5));

        let clusters = EventClusterer::default().cluster(&detections);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 6);
        assert!(clusters[0].contains(&0));
    }

    #[test]
    fn test_deterministic() {
        let mut detections = tight_group(-42.0, -71.0, 7);
        detections.extend(tight_group(-42.02, -71.0, 4));
        detections.extend(tight_group(-42.5, -71.5, 9));

        let clusterer = EventClusterer::default();
        let first = clusterer.cluster(&detections);
        for _ in 0..5 {
            assert_eq!(clusterer.cluster(&detections), first);
        }

        for cluster in &first {
            assert!(cluster.len() >= clusterer.min_points());
        }
    }
}
