use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine-wide tunables, one value per map instance.
///
/// Defaults reflect the dashboard maps this engine was built for: datasets of
/// tens to low thousands of points, viewed in a container of a few hundred
/// pixels per side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
    /// Multiplicative zoom step per wheel notch (>1)
    pub wheel_step: f64,
    /// Cluster merge radius in screen pixels; divided by zoom to get the
    /// effective world-space radius
    pub cluster_radius_px: f64,
    /// Lower bound on the zoom divisor for the greedy strategy, so a near-zero
    /// zoom cannot blow the merge radius up to the whole container
    pub greedy_zoom_floor: f64,
    /// Point-set size above which the greedy O(n²) strategy is refused and the
    /// hierarchical strategy selected instead
    pub greedy_point_limit: usize,
    /// Zoom level at and above which the hierarchical strategy stops merging
    /// and returns single-point clusters
    pub disable_clustering_at_zoom: f64,
    /// Debounce window for viewport settle events
    pub debounce: Duration,
    /// Decimal places used when formatting bounding boxes into fetch keys
    pub fetch_precision: usize,
    /// Padding factor applied around drill-down fit bounds
    pub fit_padding: f64,
    /// Inner padding of the projected drawing area, in pixels
    pub projector_pad: f64,
    /// Capacity of the point-detail LRU cache
    pub detail_cache_capacity: usize,
    /// Numeric attribute averaged into `Cluster::aggregated_value`
    pub aggregate_attribute: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_zoom: 1.0,
            max_zoom: 18.0,
            wheel_step: 1.2,
            cluster_radius_px: 48.0,
            greedy_zoom_floor: 1.0,
            greedy_point_limit: 512,
            disable_clustering_at_zoom: 16.0,
            debounce: Duration::from_millis(300),
            fetch_precision: 6,
            fit_padding: 0.15,
            projector_pad: 16.0,
            detail_cache_capacity: 256,
            aggregate_attribute: "occupancy_percent".to_string(),
        }
    }
}
