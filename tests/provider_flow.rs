//! Exercises the async provider boundary: the engine dispatches debounced
//! viewport-keyed fetches to a mock provider and applies or drops the
//! responses through the tracker.

use pinmap::prelude::*;
use pinmap::MapError;
use std::sync::atomic::{AtomicUsize, Ordering};

struct MockProvider {
    points: Vec<GeoPoint>,
    calls: AtomicUsize,
    fail: bool,
}

impl MockProvider {
    fn serving(points: Vec<GeoPoint>) -> Self {
        Self {
            points,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            points: Vec::new(),
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PointProvider for MockProvider {
    async fn fetch_points(&self, bounds: &LatLngBounds, _zoom: f64) -> Result<Vec<GeoPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Box::new(MapError::DataUnavailable));
        }
        Ok(self
            .points
            .iter()
            .filter(|p| bounds.contains(&p.position))
            .cloned()
            .collect())
    }

    async fn fetch_detail(&self, id: &str) -> Result<PointDetail> {
        Ok(PointDetail {
            id: id.to_string(),
            label: id.to_uppercase(),
            units: vec![],
        })
    }

    async fn fetch_leaves(&self, _cluster_id: &str, _limit: usize) -> Result<Vec<GeoPoint>> {
        Ok(vec![])
    }
}

fn engine() -> MapEngine {
    let viewport = Viewport::new(
        LatLngBounds::from_coords(0.0, 0.0, 10.0, 10.0),
        1.0,
        Point::new(800.0, 600.0),
    );
    MapEngine::new(EngineConfig::default(), viewport, false)
}

#[tokio::test]
async fn settle_drives_exactly_one_provider_call() {
    let provider = MockProvider::serving(vec![
        GeoPoint::new("a", "A", 5.0, 5.0),
        GeoPoint::new("far", "Far", 80.0, 170.0),
    ]);
    let mut e = engine();
    let t0 = Instant::now();

    e.handle_event(
        InputEvent::Resize {
            size: Point::new(800.0, 600.0),
        },
        t0,
    );

    // Inside the debounce window nothing is dispatched
    assert!(!e.refresh_via(&provider, t0 + Duration::from_millis(100)).await);
    assert_eq!(provider.calls(), 0);

    // After the window, one fetch with the visible region applied
    assert!(e.refresh_via(&provider, t0 + Duration::from_millis(400)).await);
    assert_eq!(provider.calls(), 1);
    assert_eq!(e.status(), DataStatus::Fresh);

    let ids: Vec<&str> = e.points().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a"]);

    // No further dispatch without a new settle
    assert!(!e.refresh_via(&provider, t0 + Duration::from_secs(5)).await);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_points() {
    let provider = MockProvider::failing();
    let mut e = engine();
    e.set_points(vec![GeoPoint::new("keep", "Keep", 5.0, 5.0)]);

    let t0 = Instant::now();
    e.handle_event(InputEvent::DragEnd, t0);
    assert!(e.refresh_via(&provider, t0 + Duration::from_secs(1)).await);

    assert_eq!(e.status(), DataStatus::Stale);
    assert_eq!(e.points().len(), 1);
    assert_eq!(e.points()[0].id, "keep");
}

#[tokio::test]
async fn wait_and_refresh_sleeps_out_the_debounce_window() {
    let provider = MockProvider::serving(vec![GeoPoint::new("a", "A", 5.0, 5.0)]);
    let mut config = EngineConfig::default();
    config.debounce = Duration::from_millis(20);
    let viewport = Viewport::new(
        LatLngBounds::from_coords(0.0, 0.0, 10.0, 10.0),
        1.0,
        Point::new(800.0, 600.0),
    );
    let mut e = MapEngine::new(config, viewport, false);

    // Nothing scheduled yet
    assert!(!e.wait_and_refresh(&provider).await);

    e.handle_event(InputEvent::DragEnd, Instant::now());
    assert!(e.wait_and_refresh(&provider).await);
    assert_eq!(provider.calls(), 1);
    assert_eq!(e.points().len(), 1);
}

#[tokio::test]
async fn fetched_points_drive_clustering_and_drill_down() {
    let provider = MockProvider::serving(vec![
        GeoPoint::new("p2", "Bravo", 5.0, 5.0),
        GeoPoint::new("p1", "Alpha", 5.001, 5.001),
        GeoPoint::new("p3", "Charlie", 5.002, 5.0),
    ]);
    let mut e = engine();

    let t0 = Instant::now();
    e.handle_event(InputEvent::DragEnd, t0);
    assert!(e.refresh_via(&provider, t0 + Duration::from_secs(1)).await);

    let state = e.render_state();
    assert_eq!(state.clusters.len(), 1);
    let cluster = &state.clusters[0].cluster;
    assert_eq!(cluster.count, 3);

    let members = e.drill_down(&cluster.id).unwrap();
    let labels: Vec<&str> = members.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["Alpha", "Bravo", "Charlie"]);
}
