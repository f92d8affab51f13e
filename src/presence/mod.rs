//! Live cursor presence for a board.
//!
//! ARCHITECTURE
//! ============
//! Each viewer owns one slot at `boards/{board}/presence/cursors/{viewer}`.
//!
//! - [`PresenceBroadcaster`] writes the local pointer into that slot at a
//!   bounded rate and guarantees the slot disappears on leave or disconnect.
//! - [`PresenceSubscriber`] reads every peer's slot and eases the rendered
//!   cursors between updates.
//!
//! The send/ease decisions themselves are pure and live in
//! `canvas::presence`; this module only adds the store and the clock.

pub mod broadcaster;
pub mod subscriber;

pub use broadcaster::PresenceBroadcaster;
pub use subscriber::PresenceSubscriber;

/// Identity resolved before the board mounts. Opaque to the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
    pub name: String,
    pub tag: String,
}

impl Viewer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), tag: tag.into() }
    }

    /// Cursor colour derived from the identity, stable across reconnects.
    #[must_use]
    pub fn color(&self) -> &'static str {
        canvas::presence::cursor_color(&self.id)
    }
}
