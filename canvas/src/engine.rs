//! Interactive surface core: pointer/wheel dispatch over the gesture machine.
//!
//! `EngineCore` owns the local document, the camera, and the active
//! [`Gesture`]. Input handlers mutate local state optimistically and return
//! [`Action`]s; the host decides what to do with them (capture the pointer,
//! repaint, persist). Nothing here performs I/O, so the whole state machine
//! is testable without a store or a browser.

use crate::camera::{Camera, Point};
use crate::doc::{BoardElement, DocStore, ElementBounds, ElementId};
use crate::hit::{Control, HitPart, hit_test};
use crate::input::{Button, Gesture, WheelDelta};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Route all further pointer events to this surface until release.
    CapturePointer,
    ReleasePointer,
    /// A drag ended; persist the final position.
    PersistPosition { id: ElementId, x: f64, y: f64 },
    /// A resize ended; persist the final (clamped) size.
    PersistSize { id: ElementId, w: f64, h: f64 },
    /// The element's remove control was pressed.
    RemoveRequested { id: ElementId },
    RenderNeeded,
}

/// Core engine state for one board surface.
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: Camera,
    pub gesture: Gesture,
    pub bounds: ElementBounds,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(ElementBounds::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(bounds: ElementBounds) -> Self {
        Self {
            doc: DocStore::new(),
            camera: Camera::default(),
            gesture: Gesture::Idle,
            bounds,
            viewport_width: 0.0,
            viewport_height: 0.0,
        }
    }

    // --- Data inputs ---

    /// Replace the local document with an authoritative snapshot.
    ///
    /// The element under an active drag or resize keeps its local geometry so
    /// a peer's write cannot yank it out from under the pointer. Its value is
    /// reconciled when the gesture's own write lands.
    pub fn apply_snapshot(&mut self, elements: Vec<BoardElement>) {
        let held = self
            .gesture
            .element_id()
            .and_then(|id| self.doc.get(id))
            .map(|el| (el.id.clone(), el.x, el.y, el.w, el.h));

        self.doc.load_snapshot(elements);

        if let Some((id, x, y, w, h)) = held {
            match self.gesture {
                Gesture::Dragging { .. } => {
                    self.doc.set_position(&id, x, y);
                }
                Gesture::Resizing { .. } => {
                    self.doc.set_size(&id, w, h);
                }
                Gesture::Idle | Gesture::Panning { .. } => {}
            }
        }
    }

    /// Drop an element locally ahead of the store confirming the removal.
    pub fn apply_remove(&mut self, id: &str) {
        self.doc.remove(id);
    }

    /// Update viewport dimensions (CSS pixels).
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width.max(0.0);
        self.viewport_height = height.max(0.0);
    }

    // --- Input events ---

    /// Classify a new gesture by hit target. Ignored unless idle.
    pub fn on_pointer_down(&mut self, screen: Point, button: Button) -> Vec<Action> {
        if button != Button::Primary || !self.gesture.is_idle() {
            return Vec::new();
        }

        let world = self.camera.screen_to_world(screen);
        let Some(hit) = hit_test(world, &self.doc, &self.camera) else {
            self.gesture = Gesture::Panning { start_screen: screen, start_offset: self.camera.offset };
            return vec![Action::CapturePointer];
        };
        let Some(el) = self.doc.get(&hit.element_id) else {
            return Vec::new();
        };

        match hit.part {
            HitPart::Control(Control::Remove) => {
                // The control consumes the press; no drag starts underneath it.
                vec![Action::RemoveRequested { id: hit.element_id }]
            }
            HitPart::ResizeHandle => {
                self.gesture = Gesture::Resizing { id: hit.element_id, start_screen: screen, start_size: (el.w, el.h) };
                vec![Action::CapturePointer]
            }
            HitPart::Body => {
                self.gesture = Gesture::Dragging { id: hit.element_id, start_screen: screen, start_pos: el.position() };
                vec![Action::CapturePointer]
            }
        }
    }

    /// Advance the active gesture. Never persists.
    pub fn on_pointer_move(&mut self, screen: Point) -> Vec<Action> {
        if self.track(screen) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Finish the active gesture at `screen` and emit its single durable write.
    pub fn on_pointer_up(&mut self, screen: Point) -> Vec<Action> {
        self.track(screen);
        self.finish()
    }

    /// The platform took the pointer away. Still lands in `Idle`, and a drag
    /// or resize persists whatever value it reached.
    pub fn on_pointer_cancel(&mut self) -> Vec<Action> {
        self.finish()
    }

    /// Zoom around the pointer. Ignored while a gesture is active, since every
    /// gesture maps screen deltas through the scale it started with.
    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta) -> Vec<Action> {
        if !self.gesture.is_idle() {
            return Vec::new();
        }
        if self.camera.zoom_at(screen, delta.dy) { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    // --- Queries ---

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn element(&self, id: &str) -> Option<&BoardElement> {
        self.doc.get(id)
    }

    /// World point currently at the centre of the viewport.
    #[must_use]
    pub fn world_center(&self) -> Point {
        self.camera
            .screen_to_world(Point::new(self.viewport_width * 0.5, self.viewport_height * 0.5))
    }

    // --- Internals ---

    /// Apply the gesture's value for the pointer at `screen`. Returns whether
    /// anything visible changed.
    fn track(&mut self, screen: Point) -> bool {
        let scale = self.camera.scale();
        match &self.gesture {
            Gesture::Idle => false,
            Gesture::Panning { start_screen, start_offset } => {
                let (start, origin) = (*start_screen, *start_offset);
                self.camera.pan_from(origin, start, screen);
                true
            }
            Gesture::Dragging { id, start_screen, start_pos } => {
                let delta = screen.sub(*start_screen);
                let x = start_pos.x + delta.x / scale;
                let y = start_pos.y + delta.y / scale;
                self.doc.set_position(id, x, y)
            }
            Gesture::Resizing { id, start_screen, start_size } => {
                let delta = screen.sub(*start_screen);
                let (w, h) = self
                    .bounds
                    .clamp_size(start_size.0 + delta.x / scale, start_size.1 + delta.y / scale);
                self.doc.set_size(id, w, h)
            }
        }
    }

    fn finish(&mut self) -> Vec<Action> {
        let gesture = std::mem::take(&mut self.gesture);
        let mut actions = Vec::new();
        match gesture {
            Gesture::Idle => return actions,
            Gesture::Panning { .. } => actions.push(Action::ReleasePointer),
            Gesture::Dragging { id, start_pos, .. } => {
                actions.push(Action::ReleasePointer);
                if let Some(el) = self.doc.get(&id) {
                    let (x, y) = (el.x.round(), el.y.round());
                    self.doc.set_position(&id, x, y);
                    if Point::new(x, y) != start_pos {
                        actions.push(Action::PersistPosition { id, x, y });
                    }
                }
                actions.push(Action::RenderNeeded);
            }
            Gesture::Resizing { id, start_size, .. } => {
                actions.push(Action::ReleasePointer);
                if let Some(el) = self.doc.get(&id) {
                    let (w, h) = self.bounds.clamp_size(el.w.round(), el.h.round());
                    self.doc.set_size(&id, w, h);
                    if (w, h) != start_size {
                        actions.push(Action::PersistSize { id, w, h });
                    }
                }
                actions.push(Action::RenderNeeded);
            }
        }
        actions
    }
}
