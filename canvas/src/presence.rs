//! Cursor presence: local pointer tracking and remote cursor interpolation.
//!
//! Two halves of the same feature live here, both free of I/O and clocks:
//!
//! - [`PointerTracker`] decides *when* the local pointer should be published.
//!   Pointer events only mark state dirty; a periodic tick asks
//!   [`PointerTracker::poll`] whether to send, which bounds bandwidth no
//!   matter how fast the pointer moves.
//! - [`RemoteCursors`] keeps one [`RenderedCursor`] per peer and eases the
//!   drawn position toward the last received target every animation frame.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::consts::{INTERPOLATION_WINDOW_MS, SNAP_EPSILON_PX};

/// Cursor palette. Indexed by [`cursor_color`].
pub const CURSOR_PALETTE: [&str; 10] = [
    "#e8590c", "#2f9e44", "#1971c2", "#c2255c", "#6741d9", "#0c8599", "#f08c00", "#5c940d", "#ae3ec9", "#364fc7",
];

/// Stable colour for a viewer identity.
///
/// FNV-1a over the UTF-8 bytes, so every client (and every reconnect) agrees
/// on the colour without coordinating.
#[must_use]
pub fn cursor_color(identity: &str) -> &'static str {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in identity.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    CURSOR_PALETTE[(hash as usize) % CURSOR_PALETTE.len()]
}

/// A viewer's published cursor, as stored in the presence collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPresence {
    /// World-space pointer position.
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    /// Broadcast time, milliseconds since the Unix epoch.
    #[serde(default, rename = "updatedAt")]
    pub updated_at: i64,
}

// =============================================================================
// LOCAL POINTER
// =============================================================================

/// Local pointer state sampled by the presence tick.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    world: Point,
    active: bool,
    dirty: bool,
    last_sent_ms: Option<i64>,
}

impl PointerTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer entered, moved, or pressed inside the surface. No network call.
    pub fn pointer_at(&mut self, world: Point) {
        self.world = world;
        self.active = true;
        self.dirty = true;
    }

    /// Pointer left the surface. Returns whether it was active, i.e. whether
    /// a presence slot may exist that must be deleted.
    pub fn leave(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        self.dirty = false;
        self.last_sent_ms = None;
        was_active
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Tick decision: the position to publish now, if any.
    ///
    /// Publishes while active when the position changed since the last send,
    /// or when `keepalive_ms` passed so a still pointer stays fresh.
    #[must_use]
    pub fn poll(&self, now_ms: i64, keepalive_ms: i64) -> Option<Point> {
        if !self.active {
            return None;
        }
        let stale = self
            .last_sent_ms
            .is_none_or(|sent| now_ms.saturating_sub(sent) >= keepalive_ms);
        (self.dirty || stale).then_some(self.world)
    }

    /// Record a publish attempt. A failed publish is recorded too: the next
    /// pointer move or keep-alive retries with fresh data.
    pub fn mark_sent(&mut self, now_ms: i64) {
        self.dirty = false;
        self.last_sent_ms = Some(now_ms);
    }
}

// =============================================================================
// REMOTE CURSORS
// =============================================================================

/// One peer's cursor as drawn locally.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCursor {
    pub viewer_id: String,
    /// Current eased position, world space.
    pub world: Point,
    /// Latest position received from the store.
    pub target: Point,
    pub name: String,
    pub tag: String,
    pub color: String,
    /// Time left until `world` reaches `target`.
    remaining_ms: f64,
}

/// Shadow state of every peer's cursor, eased frame by frame.
#[derive(Debug, Clone)]
pub struct RemoteCursors {
    entries: BTreeMap<String, RenderedCursor>,
    window_ms: f64,
    snap_epsilon_px: f64,
}

impl Default for RemoteCursors {
    fn default() -> Self {
        Self::new(INTERPOLATION_WINDOW_MS, SNAP_EPSILON_PX)
    }
}

impl RemoteCursors {
    #[must_use]
    pub fn new(window_ms: f64, snap_epsilon_px: f64) -> Self {
        Self { entries: BTreeMap::new(), window_ms: window_ms.max(1.0), snap_epsilon_px: snap_epsilon_px.max(0.0) }
    }

    /// Reconcile with a full presence snapshot.
    ///
    /// New peers appear at their received position with no fly-in. Known peers
    /// only get a new target (and label/colour). Peers missing from the
    /// snapshot, and the local viewer, are dropped.
    pub fn apply_snapshot<I>(&mut self, peers: I, self_id: &str)
    where
        I: IntoIterator<Item = (String, CursorPresence)>,
    {
        let mut next = BTreeMap::new();
        for (viewer_id, presence) in peers {
            if viewer_id == self_id {
                continue;
            }
            let target = Point::new(presence.x, presence.y);
            let entry = match self.entries.remove(&viewer_id) {
                Some(mut existing) => {
                    if existing.target != target {
                        existing.target = target;
                        existing.remaining_ms = self.window_ms;
                    }
                    existing.name = presence.name;
                    existing.tag = presence.tag;
                    existing.color = presence.color;
                    existing
                }
                None => RenderedCursor {
                    viewer_id: viewer_id.clone(),
                    world: target,
                    target,
                    name: presence.name,
                    tag: presence.tag,
                    color: presence.color,
                    remaining_ms: 0.0,
                },
            };
            next.insert(viewer_id, entry);
        }
        self.entries = next;
    }

    /// Advance every cursor by one animation frame of `dt_ms`.
    ///
    /// Each frame covers the fraction `dt / remaining` of the distance still
    /// to go, so a cursor lands exactly on its target one window after the
    /// target arrived and never overshoots. Within `snap_epsilon_px` it snaps.
    pub fn advance(&mut self, dt_ms: f64) {
        let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        for cursor in self.entries.values_mut() {
            if cursor.world == cursor.target {
                cursor.remaining_ms = 0.0;
                continue;
            }
            if cursor.remaining_ms <= dt {
                cursor.world = cursor.target;
                cursor.remaining_ms = 0.0;
                continue;
            }
            let alpha = dt / cursor.remaining_ms;
            cursor.world = Point::new(
                cursor.world.x + (cursor.target.x - cursor.world.x) * alpha,
                cursor.world.y + (cursor.target.y - cursor.world.y) * alpha,
            );
            cursor.remaining_ms -= dt;
            if cursor.world.distance(cursor.target) < self.snap_epsilon_px {
                cursor.world = cursor.target;
                cursor.remaining_ms = 0.0;
            }
        }
    }

    /// Rendered cursors, ordered by viewer id.
    pub fn cursors(&self) -> impl Iterator<Item = &RenderedCursor> {
        self.entries.values()
    }

    #[must_use]
    pub fn get(&self, viewer_id: &str) -> Option<&RenderedCursor> {
        self.entries.get(viewer_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
