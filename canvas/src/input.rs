//! Input model: mouse buttons, wheel deltas, and the gesture state machine.
//!
//! `Gesture` is the active pointer interaction tracked between pointer-down
//! and pointer-up. Each active variant carries everything needed to compute
//! the current value from the pointer position alone, so intermediate moves
//! never accumulate error and the final value can be persisted on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::doc::ElementId;

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger touch).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, Default)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down = zoom out).
    pub dy: f64,
}

/// The gesture in progress on one surface. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging the background pans the camera.
    Panning {
        /// Screen point of the pointer-down.
        start_screen: Point,
        /// Camera offset at pointer-down.
        start_offset: Point,
    },
    /// Moving an element.
    Dragging {
        id: ElementId,
        /// Screen point of the pointer-down.
        start_screen: Point,
        /// Element top-left at pointer-down, world space.
        start_pos: Point,
    },
    /// Resizing an element from its bottom-right handle.
    Resizing {
        id: ElementId,
        /// Screen point of the pointer-down.
        start_screen: Point,
        /// Element `(w, h)` at pointer-down, world pixels.
        start_size: (f64, f64),
    },
}

impl Gesture {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The element this gesture is editing, if any.
    #[must_use]
    pub fn element_id(&self) -> Option<&str> {
        match self {
            Self::Dragging { id, .. } | Self::Resizing { id, .. } => Some(id),
            Self::Idle | Self::Panning { .. } => None,
        }
    }
}
