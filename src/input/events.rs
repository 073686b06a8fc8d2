use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Raw input events forwarded by the rendering layer.
///
/// The engine is framework-agnostic: whatever surface paints the pins is
/// responsible for translating its native pointer/wheel/resize events into
/// this shape and feeding them to [`MapEngine::handle_event`].
///
/// [`MapEngine::handle_event`]: crate::engine::MapEngine::handle_event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Scroll wheel or pinch zoom. Positive delta zooms in.
    Wheel { delta: f64, position: Point },
    /// Start of drag operation
    DragStart { position: Point },
    /// Drag in progress; carries the current pointer position
    Drag { position: Point },
    /// End of drag operation (pointer up)
    DragEnd,
    /// Drag aborted (pointer capture lost, pointer left the container)
    DragCancel,
    /// Viewport/window resize
    Resize { size: Point },
}

impl InputEvent {
    /// Gets the pointer position associated with this event, if any
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::Wheel { position, .. } => Some(*position),
            InputEvent::DragStart { position } => Some(*position),
            InputEvent::Drag { position } => Some(*position),
            _ => None,
        }
    }

    /// Whether this event ends a gesture and thus settles the viewport.
    /// Settle events are what the data loader keys fetches from; intermediate
    /// drag frames never trigger loading.
    pub fn is_settle(&self) -> bool {
        matches!(
            self,
            InputEvent::Wheel { .. }
                | InputEvent::DragEnd
                | InputEvent::DragCancel
                | InputEvent::Resize { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_position() {
        let wheel = InputEvent::Wheel {
            delta: 1.0,
            position: Point::new(100.0, 200.0),
        };
        assert_eq!(wheel.position(), Some(Point::new(100.0, 200.0)));
        assert_eq!(InputEvent::DragEnd.position(), None);
    }

    #[test]
    fn test_settle_classification() {
        assert!(InputEvent::DragEnd.is_settle());
        assert!(InputEvent::DragCancel.is_settle());
        assert!(InputEvent::Wheel {
            delta: -1.0,
            position: Point::default()
        }
        .is_settle());
        assert!(InputEvent::Resize {
            size: Point::new(640.0, 480.0)
        }
        .is_settle());

        assert!(!InputEvent::Drag {
            position: Point::default()
        }
        .is_settle());
        assert!(!InputEvent::DragStart {
            position: Point::default()
        }
        .is_settle());
    }
}
