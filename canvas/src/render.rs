//! Rendering: builds a screen-space display list for the host to paint.
//!
//! The host owns the actual drawing surface. This module receives read-only
//! views of document, camera and cursor state and produces a [`Scene`]: grid
//! lines, element rectangles with their handles, and peer cursors, all
//! already transformed through the local camera. It mutates nothing.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::camera::{Camera, Point};
use crate::consts::{GRID_SPACING, MIN_GRID_SCREEN_SPACING_PX};
use crate::doc::{BoardElement, ElementId};
use crate::engine::EngineCore;
use crate::hit;
use crate::presence::RemoteCursors;

/// Every n-th grid line is drawn as a major line.
const MAJOR_GRID_EVERY: i64 = 5;

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    pub from: Point,
    pub to: Point,
    pub major: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementShape {
    pub id: ElementId,
    pub rect: ScreenRect,
    pub title: String,
    pub handle: ScreenRect,
    pub control: ScreenRect,
    /// Under an active drag or resize.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CursorMarker {
    pub viewer_id: String,
    pub at: Point,
    pub label: String,
    pub color: String,
}

/// One frame's worth of drawing, bottom layer first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub grid: Vec<GridLine>,
    pub elements: Vec<ElementShape>,
    pub cursors: Vec<CursorMarker>,
}

/// Build the scene for the current engine state and interpolated cursors.
#[must_use]
pub fn build_scene(core: &EngineCore, cursors: &RemoteCursors) -> Scene {
    let camera = core.camera;
    let active = core.gesture.element_id();

    let elements = core
        .doc
        .sorted_elements()
        .into_iter()
        .map(|el| ElementShape {
            id: el.id.clone(),
            rect: to_screen_rect(&camera, (el.x, el.y, el.w, el.h)),
            title: el.payload.title.clone(),
            handle: to_screen_rect(&camera, hit::handle_rect(el, &camera)),
            control: to_screen_rect(&camera, hit::control_rect(el, &camera)),
            active: active == Some(el.id.as_str()),
        })
        .collect();

    let cursors = cursors
        .cursors()
        .map(|c| CursorMarker {
            viewer_id: c.viewer_id.clone(),
            at: camera.world_to_screen(c.world),
            label: if c.name.is_empty() { c.tag.clone() } else { c.name.clone() },
            color: c.color.clone(),
        })
        .collect();

    Scene { grid: grid_lines(&camera, core.viewport_width, core.viewport_height), elements, cursors }
}

/// Screen rectangle of an element, e.g. for host-side overlays.
#[must_use]
pub fn element_screen_rect(camera: &Camera, el: &BoardElement) -> ScreenRect {
    to_screen_rect(camera, (el.x, el.y, el.w, el.h))
}

fn to_screen_rect(camera: &Camera, (x, y, w, h): (f64, f64, f64, f64)) -> ScreenRect {
    let top_left = camera.world_to_screen(Point::new(x, y));
    ScreenRect { x: top_left.x, y: top_left.y, w: w * camera.scale(), h: h * camera.scale() }
}

/// Visible grid lines. Empty when the viewport is empty or lines would be
/// packed tighter than `MIN_GRID_SCREEN_SPACING_PX`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn grid_lines(camera: &Camera, viewport_w: f64, viewport_h: f64) -> Vec<GridLine> {
    if viewport_w <= 0.0 || viewport_h <= 0.0 || GRID_SPACING * camera.scale() < MIN_GRID_SCREEN_SPACING_PX {
        return Vec::new();
    }

    let top_left = camera.screen_to_world(Point::new(0.0, 0.0));
    let bottom_right = camera.screen_to_world(Point::new(viewport_w, viewport_h));
    let mut lines = Vec::new();

    let first_col = (top_left.x / GRID_SPACING).ceil() as i64;
    let last_col = (bottom_right.x / GRID_SPACING).floor() as i64;
    for k in first_col..=last_col {
        let x = camera.world_to_screen(Point::new(k as f64 * GRID_SPACING, 0.0)).x;
        lines.push(GridLine {
            from: Point::new(x, 0.0),
            to: Point::new(x, viewport_h),
            major: k.rem_euclid(MAJOR_GRID_EVERY) == 0,
        });
    }

    let first_row = (top_left.y / GRID_SPACING).ceil() as i64;
    let last_row = (bottom_right.y / GRID_SPACING).floor() as i64;
    for k in first_row..=last_row {
        let y = camera.world_to_screen(Point::new(0.0, k as f64 * GRID_SPACING)).y;
        lines.push(GridLine {
            from: Point::new(0.0, y),
            to: Point::new(viewport_w, y),
            major: k.rem_euclid(MAJOR_GRID_EVERY) == 0,
        });
    }

    lines
}
