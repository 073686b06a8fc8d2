use crate::core::geo::LatLngBounds;
use crate::data::point::{GeoPoint, PointDetail};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identity of a viewport-keyed fetch.
///
/// A pure function of `(bounds, zoom)`: the bounding box formatted at a fixed
/// coordinate precision plus the rounded zoom level. Two settles that format
/// to the same key describe the same data request; the loader uses this to
/// suppress duplicate fetches and to discard stale responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchKey(String);

impl FetchKey {
    pub fn new(bounds: &LatLngBounds, zoom: f64, precision: usize) -> Self {
        Self(format!(
            "{west:.p$},{south:.p$},{east:.p$},{north:.p$}@{z}",
            west = bounds.west(),
            south = bounds.south(),
            east = bounds.east(),
            north = bounds.north(),
            z = zoom.round() as i64,
            p = precision,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fetch the loader has decided to issue
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub key: FetchKey,
    pub bounds: LatLngBounds,
    pub zoom: f64,
}

/// The external data source behind a map instance.
///
/// The engine treats every method as an opaque async call that either yields
/// records or fails with a retryable error; transport, auth and endpoint
/// shapes live entirely behind this trait.
#[async_trait::async_trait]
pub trait PointProvider: Send + Sync {
    /// Fetch the points visible in a bounding box at a zoom level
    async fn fetch_points(&self, bounds: &LatLngBounds, zoom: f64) -> Result<Vec<GeoPoint>>;

    /// Fetch the per-unit breakdown for a single point
    async fn fetch_detail(&self, id: &str) -> Result<PointDetail>;

    /// Fetch up to `limit` member points of a server-known cluster.
    /// Only meaningful for providers backing the hierarchical strategy.
    async fn fetch_leaves(&self, cluster_id: &str, limit: usize) -> Result<Vec<GeoPoint>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> LatLngBounds {
        LatLngBounds::from_coords(40.1234567, -74.7654321, 41.0, -73.5)
    }

    #[test]
    fn test_key_formats_at_fixed_precision() {
        let key = FetchKey::new(&bounds(), 11.0, 6);
        assert_eq!(key.as_str(), "-74.765432,40.123457,-73.500000,41.000000@11");
    }

    #[test]
    fn test_key_is_pure_function_of_inputs() {
        let a = FetchKey::new(&bounds(), 11.2, 6);
        let b = FetchKey::new(&bounds(), 11.2, 6);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_ignores_sub_precision_noise() {
        let a = FetchKey::new(&bounds(), 11.0, 6);
        let mut noisy = bounds();
        noisy.south_west.lng += 1e-9;
        let b = FetchKey::new(&noisy, 11.0, 6);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_rounds_zoom() {
        let a = FetchKey::new(&bounds(), 11.2, 6);
        let b = FetchKey::new(&bounds(), 10.8, 6);
        let c = FetchKey::new(&bounds(), 11.6, 6);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
