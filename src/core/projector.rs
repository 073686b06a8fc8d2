use crate::core::geo::{LatLng, Point};
use crate::core::viewport::Viewport;
use serde::{Deserialize, Serialize};

/// Projects world coordinates into container pixel space for a viewport.
///
/// The projection is a linear min/max normalization of the viewport's world
/// bounds onto the padded container rectangle, with the y axis flipped
/// (screen y grows downward, latitude grows upward). It is deterministic and
/// invertible, which the drag-to-pan math relies on. Stateless apart from the
/// padding; a pure function of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateProjector {
    /// Inner padding of the drawing area, in pixels
    pub pad: f64,
}

impl CoordinateProjector {
    pub fn new(pad: f64) -> Self {
        Self { pad }
    }

    /// Projects a world coordinate to container pixel coordinates
    pub fn project(&self, viewport: &Viewport, world: &LatLng) -> Point {
        let (inner_w, inner_h) = self.inner_size(viewport);
        let b = &viewport.bounds;

        let x_norm = (world.lng - b.west()) / (b.east() - b.west());
        let y_norm = (world.lat - b.south()) / (b.north() - b.south());

        Point::new(
            self.pad + x_norm * inner_w,
            self.pad + (1.0 - y_norm) * inner_h,
        )
    }

    /// Recovers the world coordinate at a container pixel position
    pub fn unproject(&self, viewport: &Viewport, screen: &Point) -> LatLng {
        let (inner_w, inner_h) = self.inner_size(viewport);
        let b = &viewport.bounds;

        let x_norm = (screen.x - self.pad) / inner_w;
        let y_norm = 1.0 - (screen.y - self.pad) / inner_h;

        LatLng::new(
            b.south() + y_norm * (b.north() - b.south()),
            b.west() + x_norm * (b.east() - b.west()),
        )
    }

    fn inner_size(&self, viewport: &Viewport) -> (f64, f64) {
        (
            (viewport.size.x - 2.0 * self.pad).max(1.0),
            (viewport.size.y - 2.0 * self.pad).max(1.0),
        )
    }
}

impl Default for CoordinateProjector {
    fn default() -> Self {
        Self::new(16.0)
    }
}
