// Spatial duplicate detection.
// Photos taken at the same sign are grouped greedily: each photo is compared
// with the first member of every existing cluster, in creation order, and joins
// the first one within the radius. Clusters can therefore creep when points chain.

use crate::core::scanner::PhotoRecord;

pub const DEFAULT_DEDUP_RADIUS_M: f64 = 50.0;

pub struct DuplicateDetector {
    pub radius_m: f64,
}

impl DuplicateDetector {
    pub fn new(radius_m: f64) -> Self {
        Self { radius_m }
    }

    /// Group photos into clusters, preserving encounter order inside each one
    /// and creation order across them.
    pub fn cluster(&self, photos: Vec<PhotoRecord>) -> Vec<Vec<PhotoRecord>> {
        let mut clusters: Vec<Vec<PhotoRecord>> = Vec::new();

        for photo in photos {
            let home = clusters
                .iter_mut()
                .find(|cluster| cluster[0].coords.distance_m(&photo.coords) <= self.radius_m);

            match home {
                Some(cluster) => cluster.push(photo),
                None => clusters.push(vec![photo]),
            }
        }

        clusters
    }

    /// One representative per cluster: the latest capture time wins, unknown
    /// times lose to any known time, and the first of equal times is kept.
    pub fn deduplicate(&self, photos: Vec<PhotoRecord>) -> Vec<PhotoRecord> {
        self.cluster(photos)
            .into_iter()
            .filter_map(|cluster| {
                cluster
                    .into_iter()
                    .reduce(|best, photo| if photo.captured_at > best.captured_at { photo } else { best })
            })
            .collect()
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_RADIUS_M)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exif::parse_exif_datetime;
    use crate::core::location::GeoPoint;
    use std::path::PathBuf;

    fn photo(name: &str, lat: f64, lon: f64, taken: Option<&str>) -> PhotoRecord {
        PhotoRecord {
            path: PathBuf::from(name),
            coords: GeoPoint::new(lat, lon).unwrap(),
            captured_at: taken.and_then(parse_exif_datetime),
            orientation: 1,
        }
    }

    fn names(photos: &[PhotoRecord]) -> Vec<String> {
        photos.iter().map(|p| p.file_name()).collect()
    }

    #[test]
    fn test_same_point_keeps_latest() {
        let photos = vec![
            photo("t2.jpg", 52.0, 1.0, Some("2024:01:02 00:00:00")),
            photo("t3.jpg", 52.0, 1.0, Some("2024:01:03 00:00:00")),
            photo("t1.jpg", 52.0, 1.0, Some("2024:01:01 00:00:00")),
        ];
        let result = DuplicateDetector::default().deduplicate(photos);
        assert_eq!(names(&result), vec!["t3.jpg"]);
    }

    #[test]
    fn test_far_apart_photos_both_kept() {
        // 0.001 degrees of latitude is about 111 m
        let photos = vec![
            photo("a.jpg", 52.000, 1.0, None),
            photo("b.jpg", 52.001, 1.0, None),
        ];
        let result = DuplicateDetector::default().deduplicate(photos);
        assert_eq!(names(&result), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_unknown_time_loses_and_ties_keep_first() {
        let photos = vec![
            photo("unknown.jpg", 52.0, 1.0, None),
            photo("first.jpg", 52.0, 1.0, Some("2024:01:01 00:00:00")),
            photo("second.jpg", 52.0, 1.0, Some("2024:01:01 00:00:00")),
        ];
        let result = DuplicateDetector::default().deduplicate(photos);
        assert_eq!(names(&result), vec!["first.jpg"]);

        let all_unknown = vec![
            photo("x.jpg", 52.0, 1.0, None),
            photo("y.jpg", 52.0, 1.0, None),
        ];
        let result = DuplicateDetector::default().deduplicate(all_unknown);
        assert_eq!(names(&result), vec!["x.jpg"]);
    }

    #[test]
    fn test_membership_compares_first_member_only() {
        // b is ~33 m from a, c is ~33 m from b but ~67 m from a
        let photos = vec![
            photo("a.jpg", 52.0000, 1.0, None),
            photo("b.jpg", 52.0003, 1.0, None),
            photo("c.jpg", 52.0006, 1.0, None),
        ];
        let clusters = DuplicateDetector::default().cluster(photos);
        assert_eq!(clusters.len(), 2);
        assert_eq!(names(&clusters[0]), vec!["a.jpg", "b.jpg"]);
        assert_eq!(names(&clusters[1]), vec!["c.jpg"]);
    }

    #[test]
    fn test_joins_first_matching_cluster_in_creation_order() {
        // p sits between two clusters and is within range of both seeds
        let photos = vec![
            photo("seed_a.jpg", 52.0000, 1.0, None),
            photo("seed_b.jpg", 52.0006, 1.0, None),
            photo("p.jpg", 52.0003, 1.0, Some("2024:01:01 00:00:00")),
        ];
        let clusters = DuplicateDetector::default().cluster(photos);
        assert_eq!(names(&clusters[0]), vec!["seed_a.jpg", "p.jpg"]);
        assert_eq!(names(&clusters[1]), vec!["seed_b.jpg"]);

        let result = DuplicateDetector::default().deduplicate(clusters.concat());
        assert_eq!(names(&result), vec!["p.jpg", "seed_b.jpg"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(DuplicateDetector::default().deduplicate(Vec::new()).is_empty());
    }
}
