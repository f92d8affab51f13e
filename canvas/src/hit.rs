//! Hit-testing a world point against the elements on the board.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::{CONTROL_SIZE_PX, HANDLE_SIZE_PX};
use crate::doc::{BoardElement, DocStore, ElementId};

/// Which part of an element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle,
    Control(Control),
}

/// Buttons drawn on an element. Presses on these never start a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Remove,
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub element_id: ElementId,
    pub part: HitPart,
}

/// World-space rectangle `(x, y, w, h)` of the remove control.
#[must_use]
pub fn control_rect(el: &BoardElement, camera: &Camera) -> (f64, f64, f64, f64) {
    let size = camera.screen_dist_to_world(CONTROL_SIZE_PX);
    (el.x + el.w - size, el.y, size, size)
}

/// World-space rectangle `(x, y, w, h)` of the resize handle.
#[must_use]
pub fn handle_rect(el: &BoardElement, camera: &Camera) -> (f64, f64, f64, f64) {
    let size = camera.screen_dist_to_world(HANDLE_SIZE_PX);
    (el.x + el.w - size, el.y + el.h - size, size, size)
}

fn in_rect(pt: Point, (x, y, w, h): (f64, f64, f64, f64)) -> bool {
    pt.x >= x && pt.x <= x + w && pt.y >= y && pt.y <= y + h
}

/// Find the top-most element under `world_pt`.
///
/// Controls win over the resize handle, which wins over the body. Control and
/// handle sizes are fixed in screen pixels, so they grow in world units as the
/// camera zooms out.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &DocStore, camera: &Camera) -> Option<Hit> {
    doc.sorted_elements()
        .into_iter()
        .rev()
        .find(|el| el.contains(world_pt))
        .map(|el| {
            let part = if in_rect(world_pt, control_rect(el, camera)) {
                HitPart::Control(Control::Remove)
            } else if in_rect(world_pt, handle_rect(el, camera)) {
                HitPart::ResizeHandle
            } else {
                HitPart::Body
            };
            Hit { element_id: el.id.clone(), part }
        })
}
