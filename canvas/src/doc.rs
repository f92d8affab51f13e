//! Document model: board elements, their task payload, and the local store.
//!
//! This module defines what is placed on a board (`BoardElement`), the task
//! content rendered inside each element (`TaskPayload`), the size limits every
//! element obeys (`ElementBounds`), and the runtime store that owns the local
//! copy of all live elements (`DocStore`).
//!
//! Data flows into this layer from element snapshots (the realtime store is
//! authoritative) and from the input engine (optimistic drag/resize edits).
//! The renderer reads from `DocStore` via `sorted_elements` for stacking order.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::consts::{MAX_ELEMENT_HEIGHT, MAX_ELEMENT_WIDTH, MIN_ELEMENT_HEIGHT, MIN_ELEMENT_WIDTH};

/// Opaque element identifier, assigned by the store on creation.
pub type ElementId = String;

/// Task content shown inside an element. The canvas never interprets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPayload {
    pub title: String,
    pub description: String,
    pub assignee: Option<String>,
    pub mood_tags: Vec<String>,
    pub urgency: Option<String>,
    pub energy: Option<String>,
    /// ISO-8601 calendar date, e.g. `2026-10-17`.
    pub due_date: Option<String>,
    pub team_members: Vec<String>,
}

/// A task card positioned on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardElement {
    /// Unique within its board.
    pub id: ElementId,
    /// Left edge in world coordinates.
    pub x: f64,
    /// Top edge in world coordinates.
    pub y: f64,
    /// Width in world pixels, inside `ElementBounds`.
    pub w: f64,
    /// Height in world pixels, inside `ElementBounds`.
    pub h: f64,
    pub payload: TaskPayload,
    /// Server-assigned creation time, milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Server-assigned time of the last write.
    pub updated_at: i64,
}

impl BoardElement {
    /// Top-left corner.
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether `world` lies inside the element rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, world: Point) -> bool {
        world.x >= self.x && world.x <= self.x + self.w && world.y >= self.y && world.y <= self.y + self.h
    }
}

/// Size limits applied to every element, in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementBounds {
    pub min_w: f64,
    pub max_w: f64,
    pub min_h: f64,
    pub max_h: f64,
}

impl Default for ElementBounds {
    fn default() -> Self {
        Self {
            min_w: MIN_ELEMENT_WIDTH,
            max_w: MAX_ELEMENT_WIDTH,
            min_h: MIN_ELEMENT_HEIGHT,
            max_h: MAX_ELEMENT_HEIGHT,
        }
    }
}

impl ElementBounds {
    /// Clamp a requested size into bounds. Out-of-range input is never an error.
    #[must_use]
    pub fn clamp_size(&self, w: f64, h: f64) -> (f64, f64) {
        (clamp_or_min(w, self.min_w, self.max_w), clamp_or_min(h, self.min_h, self.max_h))
    }

    /// Positive minimums not exceeding their maximums.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min_w > 0.0 && self.min_h > 0.0 && self.min_w <= self.max_w && self.min_h <= self.max_h
    }
}

fn clamp_or_min(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Local copy of a board's elements.
pub struct DocStore {
    elements: HashMap<ElementId, BoardElement>,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { elements: HashMap::new() }
    }

    /// Insert or replace an element.
    pub fn insert(&mut self, element: BoardElement) {
        self.elements.insert(element.id.clone(), element);
    }

    /// Remove an element by id, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<BoardElement> {
        self.elements.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BoardElement> {
        self.elements.get(id)
    }

    /// Move an element. Returns false if it doesn't exist.
    pub fn set_position(&mut self, id: &str, x: f64, y: f64) -> bool {
        let Some(el) = self.elements.get_mut(id) else {
            return false;
        };
        el.x = x;
        el.y = y;
        true
    }

    /// Resize an element. Returns false if it doesn't exist.
    pub fn set_size(&mut self, id: &str, w: f64, h: f64) -> bool {
        let Some(el) = self.elements.get_mut(id) else {
            return false;
        };
        el.w = w;
        el.h = h;
        true
    }

    /// Replace all elements with a full snapshot.
    pub fn load_snapshot(&mut self, elements: Vec<BoardElement>) {
        self.elements.clear();
        for el in elements {
            self.elements.insert(el.id.clone(), el);
        }
    }

    /// All elements in stacking order: ascending `created_at`, ties by id.
    #[must_use]
    pub fn sorted_elements(&self) -> Vec<&BoardElement> {
        let mut els: Vec<&BoardElement> = self.elements.values().collect();
        els.sort_by(|a, b| stacking_order(a, b));
        els
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Default for DocStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic stacking order shared by every client.
#[must_use]
pub fn stacking_order(a: &BoardElement, b: &BoardElement) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
}
