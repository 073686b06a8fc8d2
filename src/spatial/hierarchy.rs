use crate::core::config::EngineConfig;
use crate::core::geo::LatLngBounds;
use crate::core::viewport::Viewport;
use crate::data::point::GeoPoint;
use crate::spatial::cluster::{Cluster, ClusterIndex};
use crate::spatial::index::{SpatialEntry, SpatialIndex};
use fxhash::FxHashMap;

/// World pixel width at zoom 0, matching the Mercator projection base
const TILE_SIZE: f64 = 256.0;

/// Clusters built for one integer zoom level, indexed by centroid for
/// bounding-box queries
struct LevelClusters {
    clusters: Vec<Cluster>,
    centroid_index: SpatialIndex<usize>,
}

/// Hierarchical/tile clusterer for geographic datasets queried by bbox.
///
/// The point set is static between data refreshes, so clustering cost is
/// amortized: each integer zoom level is clustered at most once per refresh
/// (grid binning in Web Mercator world-pixel space, cell size equal to the
/// pixel radius at that zoom), and every subsequent viewport query against
/// the same level is an R-tree lookup over cluster centroids. Scales to much
/// larger point sets than the greedy strategy.
pub struct HierarchicalClusterer {
    radius_px: f64,
    aggregate_attr: String,
    min_zoom: f64,
    max_zoom: f64,
    disable_at: f64,
    points: Vec<GeoPoint>,
    levels: FxHashMap<i64, LevelClusters>,
    memberships: FxHashMap<String, Vec<String>>,
}

impl HierarchicalClusterer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            radius_px: config.cluster_radius_px,
            aggregate_attr: config.aggregate_attribute.clone(),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            disable_at: config.disable_clustering_at_zoom,
            points: Vec::new(),
            levels: FxHashMap::default(),
            memberships: FxHashMap::default(),
        }
    }

    /// Clusters visible within a bounding box at a zoom level. The level's
    /// full cluster set is built on first use and reused for every later
    /// query at that level.
    pub fn get_clusters(&mut self, bounds: &LatLngBounds, zoom: f64) -> Vec<Cluster> {
        if self.points.is_empty() {
            return Vec::new();
        }

        let level = self.level_for(zoom);
        self.ensure_level(level);

        // Expand the query so clusters whose centroid sits just outside the
        // box (but whose members reach into it) are still returned
        let margin_deg = self.radius_px * 360.0 / (TILE_SIZE * 2_f64.powi(level as i32));
        let query = LatLngBounds::from_coords(
            bounds.south() - margin_deg,
            bounds.west() - margin_deg,
            bounds.north() + margin_deg,
            bounds.east() + margin_deg,
        );

        let level_data = &self.levels[&level];
        let mut hits: Vec<&SpatialEntry<usize>> = level_data.centroid_index.query_bounds(&query);
        hits.sort_by_key(|entry| entry.data);
        hits.iter()
            .map(|entry| level_data.clusters[entry.data].clone())
            .collect()
    }

    /// Expands a cluster into up to `limit` member point ids
    pub fn get_leaves(&self, cluster_id: &str, limit: usize) -> Option<Vec<String>> {
        self.memberships.get(cluster_id).map(|ids| {
            let mut ids = ids.clone();
            ids.truncate(limit);
            ids
        })
    }

    fn level_for(&self, zoom: f64) -> i64 {
        zoom.round().clamp(self.min_zoom, self.max_zoom) as i64
    }

    fn ensure_level(&mut self, level: i64) {
        if self.levels.contains_key(&level) {
            return;
        }

        let clusters = if (level as f64) >= self.disable_at {
            // Clustering disabled: every point is its own cluster
            self.points
                .iter()
                .map(|point| {
                    Cluster::from_members(
                        format!("pt_{}", point.id),
                        &[point],
                        &self.aggregate_attr,
                    )
                })
                .collect()
        } else {
            self.grid_cluster(level)
        };

        for cluster in &clusters {
            self.memberships
                .insert(cluster.id.clone(), cluster.member_ids.clone());
        }

        let entries = clusters
            .iter()
            .enumerate()
            .map(|(i, cluster)| SpatialEntry::new(cluster.id.clone(), cluster.centroid, i))
            .collect();

        self.levels.insert(
            level,
            LevelClusters {
                clusters,
                centroid_index: SpatialIndex::bulk(entries),
            },
        );
    }

    /// Bins points into grid cells of `radius_px` pixels in world-pixel
    /// space at the level, one cluster per occupied cell
    fn grid_cluster(&self, level: i64) -> Vec<Cluster> {
        let mut cells: FxHashMap<(i64, i64), Vec<&GeoPoint>> = FxHashMap::default();
        let mut order: Vec<(i64, i64)> = Vec::new();

        for point in &self.points {
            let wp = point.position.world_pixel(level as f64);
            let cell = (
                (wp.x / self.radius_px).floor() as i64,
                (wp.y / self.radius_px).floor() as i64,
            );
            let members = cells.entry(cell).or_default();
            if members.is_empty() {
                order.push(cell);
            }
            members.push(point);
        }

        order
            .into_iter()
            .map(|(gx, gy)| {
                let members = &cells[&(gx, gy)];
                Cluster::from_members(
                    format!("tile_{}_{}_{}", level, gx, gy),
                    members,
                    &self.aggregate_attr,
                )
            })
            .collect()
    }
}

impl ClusterIndex for HierarchicalClusterer {
    fn rebuild(&mut self, points: &[GeoPoint]) {
        self.points = points.iter().filter(|p| p.is_finite()).cloned().collect();
        self.levels.clear();
        self.memberships.clear();
    }

    fn clusters(&mut self, _viewport: &Viewport, visible: &LatLngBounds, zoom: f64) -> Vec<Cluster> {
        self.get_clusters(visible, zoom)
    }

    fn leaves(&self, cluster_id: &str, limit: usize) -> Option<Vec<String>> {
        self.get_leaves(cluster_id, limit)
    }
}
