use crate::core::geo::{LatLng, LatLngBounds, Point};
use serde::{Deserialize, Serialize};

/// Smallest world-coordinate span a viewport may collapse to. Keeps the
/// projection invertible when fitting degenerate bounds (a single point).
const MIN_SPAN: f64 = 1e-9;

/// Manages the current view of the map: world bounds, zoom, and screen size.
///
/// One Viewport is authoritative per map instance. It is created when the map
/// mounts and mutated by pan/zoom/resize interactions for the component's
/// lifetime; it is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// World-coordinate extent backing the projection
    pub bounds: LatLngBounds,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(bounds: LatLngBounds, zoom: f64, size: Point) -> Self {
        Self {
            bounds: Self::widen_degenerate(bounds),
            zoom: zoom.clamp(1.0, 18.0),
            size,
            min_zoom: 1.0,
            max_zoom: 18.0,
        }
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Sets the viewport size
    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    /// Replaces the world bounds, widening degenerate extents
    pub fn set_bounds(&mut self, bounds: LatLngBounds) {
        self.bounds = Self::widen_degenerate(bounds);
    }

    /// Fits the viewport to contain the given world bounds plus a padding
    /// factor on every edge
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds, padding_factor: f64) {
        self.set_bounds(bounds.expanded_by_factor(padding_factor));
    }

    /// Gets the center of the current world bounds
    pub fn center(&self) -> LatLng {
        self.bounds.center()
    }

    fn widen_degenerate(bounds: LatLngBounds) -> LatLngBounds {
        let span = bounds.span();
        let mut out = bounds;
        if span.lng.abs() < MIN_SPAN {
            out.south_west.lng -= MIN_SPAN;
            out.north_east.lng += MIN_SPAN;
        }
        if span.lat.abs() < MIN_SPAN {
            out.south_west.lat -= MIN_SPAN;
            out.north_east.lat += MIN_SPAN;
        }
        out
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(
            LatLngBounds::from_coords(-60.0, -120.0, 60.0, 120.0),
            1.0,
            Point::new(800.0, 600.0),
        )
    }
}
