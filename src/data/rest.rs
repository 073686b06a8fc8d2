use crate::core::geo::LatLngBounds;
use crate::data::point::{GeoPoint, PointDetail};
use crate::data::provider::PointProvider;
use crate::{MapError, Result};
use lru::LruCache;
use once_cell::sync::Lazy;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Shared async HTTP client for point fetching
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent("pinmap/0.1.0")
        .timeout(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .build()
        .expect("failed to build reqwest async client")
});

/// [`PointProvider`] backed by the dashboard's REST endpoints.
///
/// Expects three routes under the base URL:
/// `GET /media-points?west=&south=&east=&north=&zoom=` returning point
/// records, `GET /media-points/{id}` returning a per-unit breakdown, and
/// `GET /clusters/{id}/points?limit=` returning cluster members. Point
/// details are cached in a bounded LRU because pin activation tends to
/// revisit the same handful of points while the map stays put.
pub struct RestPointSource {
    base_url: String,
    details: Mutex<LruCache<String, PointDetail>>,
}

impl RestPointSource {
    pub fn new(base_url: impl Into<String>, detail_cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(detail_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            details: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cached_detail(&self, id: &str) -> Option<PointDetail> {
        if let Ok(mut cache) = self.details.lock() {
            return cache.get(id).cloned();
        }
        None
    }

    fn store_detail(&self, detail: &PointDetail) {
        if let Ok(mut cache) = self.details.lock() {
            cache.put(detail.id.clone(), detail.clone());
        }
    }
}

#[async_trait::async_trait]
impl PointProvider for RestPointSource {
    async fn fetch_points(&self, bounds: &LatLngBounds, zoom: f64) -> Result<Vec<GeoPoint>> {
        let url = format!("{}/media-points", self.base_url);
        let response = HTTP_CLIENT
            .get(&url)
            .query(&[
                ("west", bounds.west()),
                ("south", bounds.south()),
                ("east", bounds.east()),
                ("north", bounds.north()),
                ("zoom", zoom),
            ])
            .send()
            .await
            .map_err(MapError::Network)?;

        let points = response
            .error_for_status()
            .map_err(|e| MapError::Fetch(e.to_string()))?
            .json::<Vec<GeoPoint>>()
            .await
            .map_err(MapError::Network)?;

        Ok(points)
    }

    async fn fetch_detail(&self, id: &str) -> Result<PointDetail> {
        if let Some(cached) = self.cached_detail(id) {
            return Ok(cached);
        }

        let url = format!("{}/media-points/{}", self.base_url, id);
        let detail = HTTP_CLIENT
            .get(&url)
            .send()
            .await
            .map_err(MapError::Network)?
            .error_for_status()
            .map_err(|e| MapError::Fetch(e.to_string()))?
            .json::<PointDetail>()
            .await
            .map_err(MapError::Network)?;

        self.store_detail(&detail);
        Ok(detail)
    }

    async fn fetch_leaves(&self, cluster_id: &str, limit: usize) -> Result<Vec<GeoPoint>> {
        let url = format!("{}/clusters/{}/points", self.base_url, cluster_id);
        let points = HTTP_CLIENT
            .get(&url)
            .query(&[("limit", limit as u64)])
            .send()
            .await
            .map_err(MapError::Network)?
            .error_for_status()
            .map_err(|e| MapError::Fetch(e.to_string()))?
            .json::<Vec<GeoPoint>>()
            .await
            .map_err(MapError::Network)?;

        Ok(points)
    }
}
