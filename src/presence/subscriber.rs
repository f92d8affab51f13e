//! Presence subscriber — peers' cursors, eased frame by frame.
//!
//! DESIGN
//! ======
//! The subscriber is pulled by the host's animation loop rather than pushing
//! into shared state. Each [`PresenceSubscriber::frame`] first takes the
//! newest unseen presence snapshot, if any, then advances interpolation.
//! A snapshot change is therefore visible in the very next frame, and the
//! rendered peer set always equals the subscribed keys minus the local
//! viewer.

#[cfg(test)]
#[path = "subscriber_test.rs"]
mod subscriber_test;

use std::sync::Arc;

use canvas::presence::{CursorPresence, RemoteCursors, RenderedCursor};
use tracing::{debug, trace};

use crate::config::CanvasConfig;
use crate::store::{CollectionPath, RealtimeStore, Snapshot, StoreError, Subscription};

pub struct PresenceSubscriber {
    subscription: Subscription,
    self_id: String,
    cursors: RemoteCursors,
}

impl PresenceSubscriber {
    /// Subscribe to the board's cursor collection.
    ///
    /// # Errors
    ///
    /// Fails when the store rejects the subscription.
    pub async fn subscribe(
        store: Arc<dyn RealtimeStore>,
        board_id: &str,
        self_id: impl Into<String>,
        config: &CanvasConfig,
    ) -> Result<Self, StoreError> {
        let subscription = store.subscribe(&CollectionPath::cursors(board_id)).await?;
        let mut subscriber = Self {
            subscription,
            self_id: self_id.into(),
            cursors: RemoteCursors::new(config.interpolation_window_ms, config.snap_epsilon_px),
        };
        subscriber.poll();
        Ok(subscriber)
    }

    /// Apply the newest unseen snapshot. Returns whether one arrived.
    pub fn poll(&mut self) -> bool {
        let Some(snapshot) = self.subscription.try_next() else {
            return false;
        };
        let peers = decode_peers(&snapshot);
        trace!(peers = peers.len(), "presence: snapshot");
        self.cursors.apply_snapshot(peers, &self.self_id);
        true
    }

    /// One animation frame: pick up new targets, then ease by `dt_ms`.
    pub fn frame(&mut self, dt_ms: f64) -> &RemoteCursors {
        self.poll();
        self.cursors.advance(dt_ms);
        &self.cursors
    }

    /// Rendered cursors as of the last frame.
    #[must_use]
    pub fn cursors(&self) -> &RemoteCursors {
        &self.cursors
    }

    /// Snapshot of the rendered cursors, e.g. for a host that paints later.
    #[must_use]
    pub fn rendered(&self) -> Vec<RenderedCursor> {
        self.cursors.cursors().cloned().collect()
    }
}

fn decode_peers(snapshot: &Snapshot) -> Vec<(String, CursorPresence)> {
    snapshot
        .iter()
        .filter_map(|(viewer_id, value)| match serde_json::from_value::<CursorPresence>(value.clone()) {
            Ok(presence) => Some((viewer_id.clone(), presence)),
            Err(e) => {
                debug!(%viewer_id, error = %e, "presence: skipping malformed cursor");
                None
            }
        })
        .collect()
}
