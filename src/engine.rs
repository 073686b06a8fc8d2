//! The per-map-instance engine façade.
//!
//! One `MapEngine` owns one `{viewport, pan/zoom, point set, cluster
//! strategy, tracker}` group. Multiple map instances (the operational
//! inventory map and the geographic media-point map) each hold their own
//! engine; nothing is shared between them.

use crate::core::bounds::Bounds;
use crate::core::config::EngineConfig;
use crate::core::geo::{LatLngBounds, Point};
use crate::core::projector::CoordinateProjector;
use crate::core::viewport::Viewport;
use crate::data::loader::{FetchOutcome, ViewportTracker};
use crate::data::point::{sanitize_points, GeoPoint};
use crate::data::provider::{FetchKey, FetchRequest, PointProvider};
use crate::heatmap::{HeatGrid, HeatmapAggregator};
use crate::input::events::InputEvent;
use crate::input::pan_zoom::{PanZoomController, PanZoomState};
use crate::spatial::cluster::{strategy_for_dataset, Cluster, ClusterIndex};
use crate::spatial::drilldown::DrillDown;
use crate::spatial::hierarchy::HierarchicalClusterer;
use crate::{MapError, Result};
use instant::Instant;

/// Freshness of the working point set as surfaced to the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatus {
    /// The point set matches the last applied fetch
    Fresh,
    /// A fetch for the current viewport is scheduled or in flight
    Refreshing,
    /// The last refresh failed; the previous point set is still shown.
    /// Non-fatal: the map is never cleared on a transient error.
    Stale,
}

/// A point with its screen position for the current viewport and transform.
/// Recomputed every render tick, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPoint {
    pub point: GeoPoint,
    pub screen: Point,
}

/// A cluster with the screen position of its centroid
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedCluster {
    pub cluster: Cluster,
    pub screen: Point,
}

/// Everything the rendering layer needs for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub projected_points: Vec<ProjectedPoint>,
    pub clusters: Vec<ProjectedCluster>,
    pub pan_zoom: PanZoomState,
    pub status: DataStatus,
}

/// The engine: input in, render state out, fetches keyed by the visible
/// region in between.
pub struct MapEngine {
    config: EngineConfig,
    viewport: Viewport,
    projector: CoordinateProjector,
    controller: PanZoomController,
    tracker: ViewportTracker,
    strategy: Box<dyn ClusterIndex>,
    drill: DrillDown,
    points: Vec<GeoPoint>,
    last_clusters: Vec<Cluster>,
    status: DataStatus,
    hierarchical: bool,
    malformed_count: usize,
}

impl MapEngine {
    /// Creates an engine for one map instance. `geographic` marks datasets
    /// with true lat/lng coordinates, which always use the hierarchical
    /// strategy; abstract ops-view data starts greedy and is upgraded if the
    /// set outgrows the greedy bound.
    pub fn new(config: EngineConfig, mut viewport: Viewport, geographic: bool) -> Self {
        viewport.set_zoom_limits(config.min_zoom, config.max_zoom);
        let strategy = strategy_for_dataset(&config, 0, geographic);
        Self {
            projector: CoordinateProjector::new(config.projector_pad),
            controller: PanZoomController::new(config.min_zoom, config.max_zoom, config.wheel_step),
            tracker: ViewportTracker::new(config.debounce, config.fetch_precision),
            strategy,
            drill: DrillDown::new(),
            points: Vec::new(),
            last_clusters: Vec::new(),
            status: DataStatus::Fresh,
            hierarchical: geographic,
            malformed_count: 0,
            viewport,
            config,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn pan_zoom(&self) -> PanZoomState {
        self.controller.state()
    }

    pub fn status(&self) -> DataStatus {
        self.status
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Points dropped for non-finite coordinates in the last refresh
    pub fn malformed_count(&self) -> usize {
        self.malformed_count
    }

    /// Feeds one raw input event through the pan/zoom transitions. Settle
    /// events (wheel, drag end/cancel, resize) additionally notify the
    /// tracker with the freshly visible region; intermediate drag frames
    /// never touch the loader.
    pub fn handle_event(&mut self, event: InputEvent, now: Instant) {
        match &event {
            InputEvent::Wheel { delta, position } => {
                self.controller.wheel(*delta, *position);
                self.viewport.set_zoom(self.controller.zoom());
            }
            InputEvent::DragStart { position } => self.controller.begin_drag(*position),
            InputEvent::Drag { position } => self.controller.drag_to(*position),
            InputEvent::DragEnd => self.controller.end_drag(),
            InputEvent::DragCancel => self.controller.cancel_drag(),
            InputEvent::Resize { size } => self.viewport.set_size(*size),
        }

        if event.is_settle() {
            let bounds = self.visible_bounds();
            self.tracker
                .note_settle(&bounds, self.controller.zoom(), now);
            if self.tracker.is_busy() {
                self.status = DataStatus::Refreshing;
            }
        }
    }

    /// The world region currently on screen, recovered by inverting the
    /// combined pan/zoom + projection transform at the container corners
    pub fn visible_bounds(&self) -> LatLngBounds {
        let state = self.controller.state();
        let top_left = state.invert(&Point::new(0.0, 0.0));
        let bottom_right = state.invert(&self.viewport.size);

        let nw = self.projector.unproject(&self.viewport, &top_left);
        let se = self.projector.unproject(&self.viewport, &bottom_right);

        LatLngBounds::from_coords(se.lat, nw.lng, nw.lat, se.lng)
    }

    /// Promotes a due fetch for dispatch to the data provider
    pub fn poll_fetch(&mut self, now: Instant) -> Option<FetchRequest> {
        let request = self.tracker.poll(now);
        if request.is_some() {
            self.status = DataStatus::Refreshing;
        }
        request
    }

    /// Resolves a completed fetch. An applied response replaces the point
    /// set atomically; a superseded one is discarded; a failure keeps the
    /// previous point set and surfaces a stale signal only if it concerned
    /// the latest viewport.
    pub fn apply_fetch(&mut self, key: &FetchKey, result: Result<Vec<GeoPoint>>) {
        match result {
            Ok(points) => match self.tracker.on_response(key, points) {
                FetchOutcome::Applied(points) => {
                    self.replace_points(points);
                    self.status = DataStatus::Fresh;
                }
                FetchOutcome::Discarded => {}
            },
            Err(error) => {
                log::warn!("point fetch {} failed: {}", key, error);
                if self.tracker.on_failure(key) {
                    self.status = DataStatus::Stale;
                }
            }
        }
    }

    /// Replaces the working point set directly (used by hosts that load out
    /// of band instead of through the tracker)
    pub fn set_points(&mut self, points: Vec<GeoPoint>) {
        self.replace_points(points);
        self.status = DataStatus::Fresh;
    }

    fn replace_points(&mut self, points: Vec<GeoPoint>) {
        let (clean, dropped) = sanitize_points(points);
        self.malformed_count = dropped;

        // A dataset outgrowing the greedy bound is upgraded permanently;
        // strategy choice follows the data, not the screen
        if !self.hierarchical && clean.len() > self.config.greedy_point_limit {
            log::debug!(
                "switching to hierarchical clustering at {} points",
                clean.len()
            );
            self.strategy = Box::new(HierarchicalClusterer::new(&self.config));
            self.hierarchical = true;
        }

        self.points = clean;
        self.strategy.rebuild(&self.points);
        self.drill.rebuild(&self.points);
        self.last_clusters.clear();
    }

    /// Recomputes the full render surface for this tick: projected points,
    /// clusters with screen centroids, and the live transform
    pub fn render_state(&mut self) -> RenderState {
        let state = self.controller.state();
        let zoom = state.zoom;

        let visible = self.visible_bounds();
        let clusters = self.strategy.clusters(&self.viewport, &visible, zoom);
        self.last_clusters = clusters.clone();

        let projected_points = self
            .points
            .iter()
            .map(|point| ProjectedPoint {
                screen: state.apply(&self.projector.project(&self.viewport, &point.position)),
                point: point.clone(),
            })
            .collect();

        let clusters = clusters
            .into_iter()
            .map(|cluster| ProjectedCluster {
                screen: state.apply(&self.projector.project(&self.viewport, &cluster.centroid)),
                cluster,
            })
            .collect();

        RenderState {
            projected_points,
            clusters,
            pan_zoom: state,
            status: self.status,
        }
    }

    /// Looks up a cluster from the last computed render tick
    pub fn cluster_by_id(&self, cluster_id: &str) -> Option<&Cluster> {
        self.last_clusters.iter().find(|c| c.id == cluster_id)
    }

    /// Expands a cluster into its ordered member points (stable sort by
    /// label, ties by id)
    pub fn drill_down(&self, cluster_id: &str) -> Result<Vec<GeoPoint>> {
        let cluster = self
            .cluster_by_id(cluster_id)
            .ok_or_else(|| MapError::UnknownCluster(cluster_id.to_string()))?;
        self.drill.resolve(cluster)
    }

    /// Fit-to-cluster: tightens the viewport around a cluster's members
    /// (plus the configured padding), resets the transform, and settles the
    /// tracker on the new region
    pub fn focus_cluster(&mut self, cluster_id: &str, now: Instant) -> Result<()> {
        let members = self.drill_down(cluster_id)?;
        if let Some(bounds) = DrillDown::fit_bounds(&members, self.config.fit_padding) {
            self.viewport.fit_bounds(&bounds, 0.0);
            self.controller.set_state(PanZoomState::identity());
            let visible = self.visible_bounds();
            self.tracker.note_settle(&visible, self.controller.zoom(), now);
            if self.tracker.is_busy() {
                self.status = DataStatus::Refreshing;
            }
        }
        Ok(())
    }

    /// Programmatic zoom-to-point: centers a cluster in the container at the
    /// target zoom without needing a cursor position
    pub fn zoom_to_cluster(&mut self, cluster_id: &str, target_zoom: f64, now: Instant) -> Result<()> {
        let cluster = self
            .cluster_by_id(cluster_id)
            .ok_or_else(|| MapError::UnknownCluster(cluster_id.to_string()))?;

        let base = self.projector.project(&self.viewport, &cluster.centroid);
        let center = Point::new(self.viewport.size.x / 2.0, self.viewport.size.y / 2.0);
        self.controller.zoom_to_point(base, target_zoom, center);
        self.viewport.set_zoom(self.controller.zoom());

        let visible = self.visible_bounds();
        self.tracker.note_settle(&visible, self.controller.zoom(), now);
        if self.tracker.is_busy() {
            self.status = DataStatus::Refreshing;
        }
        Ok(())
    }

    /// Hit-tests a screen position against the projected points, used when a
    /// single (non-cluster) pin is activated to key the detail fetch.
    /// Positions outside the container never hit.
    pub fn pin_at(&self, screen: Point, tolerance: f64) -> Option<&GeoPoint> {
        let container = Bounds::new(Point::new(0.0, 0.0), self.viewport.size);
        if !container.contains(&screen) {
            return None;
        }

        let state = self.controller.state();
        let mut best: Option<(&GeoPoint, f64)> = None;
        for point in &self.points {
            let projected = state.apply(&self.projector.project(&self.viewport, &point.position));
            let distance = projected.distance_to(&screen);
            if distance <= tolerance && best.map_or(true, |(_, d)| distance < d) {
                best = Some((point, distance));
            }
        }
        best.map(|(point, _)| point)
    }

    /// Convenience driver for hosts that hand the engine a provider: polls
    /// for a due fetch, awaits it, and resolves the response through the
    /// tracker. Returns whether a fetch was dispatched.
    pub async fn refresh_via<P: PointProvider + ?Sized>(
        &mut self,
        provider: &P,
        now: Instant,
    ) -> bool {
        if let Some(request) = self.poll_fetch(now) {
            let result = provider.fetch_points(&request.bounds, request.zoom).await;
            self.apply_fetch(&request.key, result);
            true
        } else {
            false
        }
    }

    /// Sleeps out the debounce window of the scheduled fetch, then
    /// dispatches it. Returns false immediately when nothing is scheduled.
    #[cfg(feature = "tokio-runtime")]
    pub async fn wait_and_refresh<P: PointProvider + ?Sized>(&mut self, provider: &P) -> bool {
        let due = match self.tracker.next_due() {
            Some(due) => due,
            None => return false,
        };
        let now = Instant::now();
        if due > now {
            tokio::time::sleep(due - now).await;
        }
        self.refresh_via(provider, Instant::now()).await
    }

    /// Region × line occupancy grid over the current point set
    pub fn heatmap(&self) -> HeatGrid {
        HeatmapAggregator::occupancy_by_region_line().aggregate(&self.points)
    }

    /// Heatmap over arbitrary categorical/numeric attribute names
    pub fn heatmap_by(&self, row_attr: &str, col_attr: &str, value_attr: &str) -> HeatGrid {
        HeatmapAggregator::new(row_attr, col_attr, value_attr).aggregate(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLngBounds;
    use instant::Duration;

    fn engine() -> MapEngine {
        let viewport = Viewport::new(
            LatLngBounds::from_coords(0.0, 0.0, 10.0, 10.0),
            1.0,
            Point::new(800.0, 600.0),
        );
        MapEngine::new(EngineConfig::default(), viewport, false)
    }

    #[test]
    fn test_visible_bounds_identity_transform() {
        let e = engine();
        let visible = e.visible_bounds();

        // With the identity transform the visible region brackets the
        // viewport's world bounds (the projector pad hangs slightly outside)
        assert!(visible.west() <= 0.0);
        assert!(visible.east() >= 10.0);
        assert!(visible.south() <= 0.0);
        assert!(visible.north() >= 10.0);
    }

    #[test]
    fn test_zoom_in_shrinks_visible_region() {
        let mut e = engine();
        let before = e.visible_bounds().span();

        e.handle_event(
            InputEvent::Wheel {
                delta: 1.0,
                position: Point::new(400.0, 300.0),
            },
            Instant::now(),
        );

        let after = e.visible_bounds().span();
        assert!(after.lat < before.lat);
        assert!(after.lng < before.lng);
    }

    #[test]
    fn test_render_state_projects_all_points() {
        let mut e = engine();
        e.set_points(vec![
            GeoPoint::new("a", "A", 5.0, 5.0),
            GeoPoint::new("b", "B", 6.0, 6.0),
        ]);

        let state = e.render_state();
        assert_eq!(state.projected_points.len(), 2);
        assert_eq!(state.status, DataStatus::Fresh);

        let total: usize = state.clusters.iter().map(|c| c.cluster.count).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_drag_updates_pan_without_fetch() {
        let mut e = engine();
        let t0 = Instant::now();

        e.handle_event(
            InputEvent::DragStart {
                position: Point::new(100.0, 100.0),
            },
            t0,
        );
        e.handle_event(
            InputEvent::Drag {
                position: Point::new(150.0, 120.0),
            },
            t0,
        );

        assert_eq!(e.pan_zoom().pan, Point::new(50.0, 20.0));
        // Mid-drag frames must not schedule fetches
        assert!(e.poll_fetch(t0 + Duration::from_secs(5)).is_none());

        e.handle_event(InputEvent::DragEnd, t0);
        assert!(e.poll_fetch(t0 + Duration::from_secs(5)).is_some());
    }

    #[test]
    fn test_failed_fetch_keeps_points_and_flags_stale() {
        let mut e = engine();
        e.set_points(vec![GeoPoint::new("a", "A", 5.0, 5.0)]);

        let t0 = Instant::now();
        e.handle_event(InputEvent::DragEnd, t0);
        let request = e.poll_fetch(t0 + Duration::from_secs(1)).unwrap();

        e.apply_fetch(&request.key, Err(Box::new(MapError::DataUnavailable)));

        assert_eq!(e.status(), DataStatus::Stale);
        assert_eq!(e.points().len(), 1);
    }

    #[test]
    fn test_malformed_points_counted() {
        let mut e = engine();
        e.set_points(vec![
            GeoPoint::new("ok", "Ok", 5.0, 5.0),
            GeoPoint::new("bad", "Bad", f64::NAN, 5.0),
        ]);

        assert_eq!(e.malformed_count(), 1);
        assert_eq!(e.points().len(), 1);
    }

    #[test]
    fn test_pin_at_hits_nearest_point_inside_container() {
        let mut e = engine();
        e.set_points(vec![
            GeoPoint::new("a", "A", 5.0, 5.0),
            GeoPoint::new("b", "B", 6.0, 6.0),
        ]);

        let state = e.render_state();
        let screen_a = state
            .projected_points
            .iter()
            .find(|p| p.point.id == "a")
            .unwrap()
            .screen;

        assert_eq!(e.pin_at(screen_a, 8.0).unwrap().id, "a");
        assert!(e.pin_at(Point::new(-10.0, -10.0), 8.0).is_none());
    }

    #[test]
    fn test_large_set_upgrades_strategy() {
        let mut e = engine();
        let points: Vec<GeoPoint> = (0..600)
            .map(|i| {
                GeoPoint::new(
                    format!("p{}", i),
                    format!("P{}", i),
                    (i % 100) as f64 / 10.0,
                    (i / 100) as f64,
                )
            })
            .collect();

        e.set_points(points);
        assert!(e.hierarchical);

        let state = e.render_state();
        let total: usize = state.clusters.iter().map(|c| c.cluster.count).sum();
        assert_eq!(total, 600);
    }
}
