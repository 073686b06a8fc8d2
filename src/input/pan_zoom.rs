use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// The live screen-space transform of a map instance.
///
/// The screen position of a world point is
/// `projected = base * zoom + pan`, where `base` is the coordinate produced
/// by [`CoordinateProjector::project`].
///
/// [`CoordinateProjector::project`]: crate::core::projector::CoordinateProjector::project
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanZoomState {
    pub zoom: f64,
    pub pan: Point,
}

impl PanZoomState {
    pub fn new(zoom: f64, pan: Point) -> Self {
        Self { zoom, pan }
    }

    /// Identity transform: zoom 1, no offset
    pub fn identity() -> Self {
        Self::new(1.0, Point::new(0.0, 0.0))
    }

    /// Applies the transform to a projected base coordinate
    pub fn apply(&self, base: &Point) -> Point {
        base.multiply(self.zoom).add(&self.pan)
    }

    /// Inverts the transform, recovering the projected base coordinate
    pub fn invert(&self, screen: &Point) -> Point {
        screen.subtract(&self.pan).multiply(1.0 / self.zoom)
    }
}

impl Default for PanZoomState {
    fn default() -> Self {
        Self::identity()
    }
}

/// An in-progress drag, created on drag-start and destroyed on drag-end or
/// cancel. Holding the start pointer and start pan as an explicit value keeps
/// the drag math independent of any event system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragSession {
    pub start_pointer: Point,
    pub start_pan: Point,
}

/// Owns the live `{zoom, pan}` transform and updates it from wheel and drag
/// input. Zoom requests beyond the clamp range are clamped, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanZoomController {
    state: PanZoomState,
    min_zoom: f64,
    max_zoom: f64,
    wheel_step: f64,
    drag: Option<DragSession>,
}

impl PanZoomController {
    pub fn new(min_zoom: f64, max_zoom: f64, wheel_step: f64) -> Self {
        Self {
            state: PanZoomState {
                zoom: 1.0_f64.clamp(min_zoom, max_zoom),
                pan: Point::new(0.0, 0.0),
            },
            min_zoom,
            max_zoom,
            wheel_step,
            drag: None,
        }
    }

    pub fn state(&self) -> PanZoomState {
        self.state
    }

    pub fn set_state(&mut self, state: PanZoomState) {
        self.state = PanZoomState {
            zoom: state.zoom.clamp(self.min_zoom, self.max_zoom),
            pan: state.pan,
        };
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom
    }

    /// Multiplies zoom by `factor` around the given cursor position, keeping
    /// the world point under the cursor stationary on screen:
    /// `pan_next = cursor - (cursor - pan_prev) * (zoom_next / zoom_prev)`.
    /// The invariant holds for every individual step, not just a net sequence.
    pub fn zoom_about(&mut self, cursor: Point, factor: f64) {
        let zoom_prev = self.state.zoom;
        let zoom_next = (zoom_prev * factor).clamp(self.min_zoom, self.max_zoom);
        if zoom_next == zoom_prev {
            return;
        }

        let ratio = zoom_next / zoom_prev;
        self.state.pan = cursor.subtract(&cursor.subtract(&self.state.pan).multiply(ratio));
        self.state.zoom = zoom_next;
    }

    /// Applies a wheel notch: positive delta zooms in by the configured step,
    /// negative zooms out
    pub fn wheel(&mut self, delta: f64, cursor: Point) {
        let factor = if delta > 0.0 {
            self.wheel_step
        } else {
            1.0 / self.wheel_step
        };
        self.zoom_about(cursor, factor);
    }

    /// Starts a drag, recording the pointer and pan at gesture start
    pub fn begin_drag(&mut self, pointer: Point) {
        self.drag = Some(DragSession {
            start_pointer: pointer,
            start_pan: self.state.pan,
        });
    }

    /// Updates pan from the current pointer position of an active drag.
    /// No zoom change. A move without an active session is ignored.
    pub fn drag_to(&mut self, pointer: Point) {
        if let Some(session) = self.drag {
            self.state.pan = session
                .start_pan
                .add(&pointer.subtract(&session.start_pointer));
        }
    }

    /// Ends the drag, keeping the pan it produced
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Tears down the drag session without further pan changes. Called on
    /// pointer cancel/capture loss so the controller can never be left
    /// stuck dragging.
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Programmatic zoom-to-point: computes the pan that centers the given
    /// projected base coordinate in the container at the target zoom. Used
    /// when a cluster is clicked; needs no prior cursor position.
    pub fn zoom_to_point(&mut self, base: Point, target_zoom: f64, container_center: Point) {
        let zoom = target_zoom.clamp(self.min_zoom, self.max_zoom);
        self.state.zoom = zoom;
        self.state.pan = container_center.subtract(&base.multiply(zoom));
    }
}
