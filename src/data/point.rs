use crate::core::geo::LatLng;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A single media point as returned by the data provider.
///
/// Immutable once fetched: a refetch replaces the whole working set, points
/// are never patched in place. Attributes beyond the identifying fields ride
/// in two small bags so the heatmap can aggregate by attribute name without
/// the engine hard-coding the dashboard's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub position: LatLng,
    /// Numeric attributes (occupancy percent, face counts, ...)
    #[serde(default)]
    pub metrics: FxHashMap<String, f64>,
    /// Categorical attributes (region, line, status, ...)
    #[serde(default)]
    pub tags: FxHashMap<String, String>,
}

impl GeoPoint {
    pub fn new(id: impl Into<String>, label: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            position: LatLng::new(lat, lng),
            metrics: FxHashMap::default(),
            tags: FxHashMap::default(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    /// Looks up a numeric attribute by name
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Looks up a categorical attribute by name
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn occupancy_percent(&self) -> Option<f64> {
        self.metric("occupancy_percent")
    }

    pub fn region(&self) -> Option<&str> {
        self.tag("region")
    }

    pub fn line(&self) -> Option<&str> {
        self.tag("line")
    }

    /// Whether the position can be projected at all
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
    }
}

/// Occupancy status of a single unit (face/screen) of a media point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOccupancy {
    pub id: String,
    pub status: String,
}

/// Richer per-point breakdown fetched when a single pin is activated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDetail {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub units: Vec<UnitOccupancy>,
}

impl PointDetail {
    /// Unit counts grouped by status string
    pub fn count_by_status(&self) -> FxHashMap<&str, usize> {
        let mut counts = FxHashMap::default();
        for unit in &self.units {
            *counts.entry(unit.status.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Splits a fetched batch into projectable points and a malformed count.
///
/// Points with non-finite coordinates are excluded before projection and
/// clustering, never coerced to (0, 0). The count is surfaced for
/// diagnostics only.
pub fn sanitize_points(points: Vec<GeoPoint>) -> (Vec<GeoPoint>, usize) {
    let total = points.len();
    let clean: Vec<GeoPoint> = points.into_iter().filter(GeoPoint::is_finite).collect();
    let dropped = total - clean.len();
    if dropped > 0 {
        log::debug!("dropped {} point(s) with non-finite coordinates", dropped);
    }
    (clean, dropped)
}
