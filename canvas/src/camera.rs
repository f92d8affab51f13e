//! Pan/zoom camera and the screen <-> world coordinate mapping.
//!
//! World coordinates are where board elements live. Screen coordinates are
//! CSS pixels inside the viewport. The mapping is
//! `screen = world * scale + offset`, and the camera is local to one viewer:
//! it is never persisted or shared with peers.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_SCALE, MIN_SCALE, ZOOM_SENSITIVITY};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    /// Component-wise sum `self + other`.
    #[must_use]
    pub fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Camera state for pan/zoom on the infinite canvas.
///
/// `offset` is the screen position of the world origin, in CSS pixels.
/// `scale` is kept inside `[MIN_SCALE, MAX_SCALE]`, so the inverse transform
/// never divides by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub offset: Point,
    scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { offset: Point::default(), scale: 1.0 }
    }
}

/// Clamp a requested scale into the allowed range. NaN maps to 1.0.
#[must_use]
pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

impl Camera {
    /// Build a camera, clamping `scale` into bounds.
    #[must_use]
    pub fn new(offset: Point, scale: f64) -> Self {
        Self { offset, scale: clamp_scale(scale) }
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Replace the scale, clamping silently.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = clamp_scale(scale);
    }

    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.offset.x) / self.scale,
            y: (screen.y - self.offset.y) / self.scale,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.scale + self.offset.x,
            y: world.y * self.scale + self.offset.y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.scale
    }

    /// Zoom around the screen point `anchor` for a wheel delta `dy`.
    ///
    /// The world point under `anchor` stays under `anchor`. Returns `false`
    /// when the clamped scale did not change (already at a bound).
    pub fn zoom_at(&mut self, anchor: Point, dy: f64) -> bool {
        let next = clamp_scale(self.scale * (-dy * ZOOM_SENSITIVITY).exp());
        self.zoom_to(anchor, next)
    }

    /// Set the scale to `next` while keeping `anchor` fixed on screen.
    pub fn zoom_to(&mut self, anchor: Point, next: f64) -> bool {
        let next = clamp_scale(next);
        if (next - self.scale).abs() < f64::EPSILON {
            return false;
        }
        let world = self.screen_to_world(anchor);
        self.scale = next;
        self.offset = Point::new(anchor.x - world.x * next, anchor.y - world.y * next);
        true
    }

    /// Pan rule: `offset = origin + (current - start)`. Scale is untouched.
    pub fn pan_from(&mut self, origin: Point, start_screen: Point, current_screen: Point) {
        self.offset = origin.add(current_screen.sub(start_screen));
    }
}
