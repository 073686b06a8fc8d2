use crate::core::geo::LatLngBounds;
use crate::data::point::GeoPoint;
use crate::spatial::cluster::Cluster;
use crate::{MapError, Result};
use fxhash::{FxHashMap, FxHashSet};

/// Resolves clusters back into their member points.
///
/// Rebuilt whenever the working point set is replaced; between refreshes,
/// resolving the same cluster twice yields the same list in the same order.
#[derive(Debug, Default)]
pub struct DrillDown {
    by_id: FxHashMap<String, GeoPoint>,
}

impl DrillDown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the point lookup with a fresh working set
    pub fn rebuild(&mut self, points: &[GeoPoint]) {
        self.by_id = points
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();
    }

    /// Returns the cluster's member points, stably sorted by label with ties
    /// broken by id: no duplicates, no omissions relative to `member_ids`.
    /// A member id missing from the working set means the cluster predates
    /// the current data refresh; that resolves to an error rather than a
    /// silently shortened list.
    pub fn resolve(&self, cluster: &Cluster) -> Result<Vec<GeoPoint>> {
        let mut seen = FxHashSet::default();
        let mut members = Vec::with_capacity(cluster.member_ids.len());

        for id in &cluster.member_ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            match self.by_id.get(id) {
                Some(point) => members.push(point.clone()),
                None => return Err(Box::new(MapError::UnknownCluster(cluster.id.clone()))),
            }
        }

        members.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));
        Ok(members)
    }

    /// Computes a viewport-ready bounds tightly containing the members plus
    /// a padding factor, for fit-to-cluster behavior. None for empty input.
    pub fn fit_bounds(members: &[GeoPoint], padding_factor: f64) -> Option<LatLngBounds> {
        let first = members.first()?;
        let mut bounds = LatLngBounds::new(first.position, first.position);
        for point in &members[1..] {
            bounds.extend(&point.position);
        }
        Some(bounds.expanded_by_factor(padding_factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;

    fn points() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new("p3", "Charlie", 40.3, -74.3),
            GeoPoint::new("p1", "Alpha", 40.1, -74.1),
            GeoPoint::new("p2", "Bravo", 40.2, -74.2),
            GeoPoint::new("p5", "Bravo", 40.5, -74.5),
            GeoPoint::new("p4", "Delta", 40.4, -74.4),
        ]
    }

    fn cluster_of(ids: &[&str]) -> Cluster {
        Cluster {
            id: "c1".into(),
            centroid: LatLng::new(40.3, -74.3),
            count: ids.len(),
            aggregated_value: None,
            member_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_resolve_sorted_by_label_then_id() {
        let mut d = DrillDown::new();
        d.rebuild(&points());

        let cluster = cluster_of(&["p3", "p1", "p5", "p2", "p4"]);
        let members = d.resolve(&cluster).unwrap();

        assert_eq!(members.len(), cluster.count);
        let ids: Vec<&str> = members.iter().map(|p| p.id.as_str()).collect();
        // Alpha, Bravo(p2), Bravo(p5), Charlie, Delta
        assert_eq!(ids, vec!["p1", "p2", "p5", "p3", "p4"]);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut d = DrillDown::new();
        d.rebuild(&points());

        let cluster = cluster_of(&["p2", "p1", "p3"]);
        let first = d.resolve(&cluster).unwrap();
        let second = d.resolve(&cluster).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_rejects_stale_cluster() {
        let mut d = DrillDown::new();
        d.rebuild(&points());

        let cluster = cluster_of(&["p1", "gone"]);
        assert!(d.resolve(&cluster).is_err());
    }

    #[test]
    fn test_fit_bounds_contains_members_with_padding() {
        let members = vec![
            GeoPoint::new("a", "A", 40.0, -75.0),
            GeoPoint::new("b", "B", 41.0, -73.0),
        ];

        let bounds = DrillDown::fit_bounds(&members, 0.1).unwrap();
        for point in &members {
            assert!(bounds.contains(&point.position));
        }
        assert!(bounds.south() < 40.0);
        assert!(bounds.north() > 41.0);

        assert!(DrillDown::fit_bounds(&[], 0.1).is_none());
    }
}
