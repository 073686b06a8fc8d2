use crate::core::geo::{LatLng, LatLngBounds};

use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A point record that can be indexed via an R-tree
#[derive(Debug, Clone)]
pub struct SpatialEntry<T> {
    pub id: String,
    pub position: LatLng,
    pub data: T,
}

impl<T> SpatialEntry<T> {
    pub fn new(id: String, position: LatLng, data: T) -> Self {
        Self { id, position, data }
    }
}

impl<T> PartialEq for SpatialEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for SpatialEntry<T> {}

// --- rstar integration -------------------------------------------------------------------------

impl<T> RTreeObject for SpatialEntry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.position.lng, self.position.lat])
    }
}

impl<T> PointDistance for SpatialEntry<T> {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position.lng - point[0];
        let dy = self.position.lat - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree based spatial index over point records.
///
/// Bulk-built: the engine replaces its point set atomically on every refetch,
/// so the index is constructed once per refresh and queried many times, never
/// mutated incrementally.
pub struct SpatialIndex<T> {
    rtree: RTree<SpatialEntry<T>>,
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self {
            rtree: RTree::new(),
        }
    }

    pub fn bulk(entries: Vec<SpatialEntry<T>>) -> Self {
        Self {
            rtree: RTree::bulk_load(entries),
        }
    }

    pub fn query_bounds(&self, bounds: &LatLngBounds) -> Vec<&SpatialEntry<T>> {
        let envelope = AABB::from_corners(
            [bounds.west(), bounds.south()],
            [bounds.east(), bounds.north()],
        );
        self.rtree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    pub fn query_radius(&self, center: &LatLng, radius: f64) -> Vec<&SpatialEntry<T>> {
        self.rtree
            .locate_within_distance([center.lng, center.lat], radius * radius)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpatialEntry<T>> {
        self.rtree.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
