//! Presence broadcaster — publishes the local pointer at a bounded rate.
//!
//! DESIGN
//! ======
//! Pointer events only touch the shared `PointerTracker`; no network call
//! happens on the event path. A background task ticks every
//! `presence_tick` and publishes when the pointer moved or the keep-alive
//! elapsed. On leave the slot is deleted right away.
//!
//! Publish and delete share an async write lock, and the tick re-reads the
//! tracker only after taking it. A publish racing a leave therefore either
//! sees the pointer inactive or lands before the delete, and a stale cursor
//! can never outlive the leave.
//!
//! ERROR HANDLING
//! ==============
//! Best-effort throughout. Failures are logged and dropped: only the latest
//! position matters, and the next move or keep-alive sends fresh data.
//! The on-disconnect directive is registered once per broadcaster, so an
//! ungraceful disconnect still clears the slot server side.

#[cfg(test)]
#[path = "broadcaster_test.rs"]
mod broadcaster_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use canvas::camera::Point;
use canvas::presence::{CursorPresence, PointerTracker};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::Viewer;
use crate::config::CanvasConfig;
use crate::store::{CollectionPath, EntryPath, RealtimeStore, server_timestamp};

/// Handle on a running presence loop. Dropping it stops the loop; use
/// [`PresenceBroadcaster::shutdown`] to also clear the slot.
pub struct PresenceBroadcaster {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

struct Shared {
    store: Arc<dyn RealtimeStore>,
    slot: EntryPath,
    viewer: Viewer,
    tracker: Mutex<PointerTracker>,
    write_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    fn tracker(&self) -> MutexGuard<'_, PointerTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, world: Point) -> serde_json::Value {
        let presence = CursorPresence {
            x: world.x,
            y: world.y,
            tag: self.viewer.tag.clone(),
            name: self.viewer.name.clone(),
            color: self.viewer.color().to_string(),
            updated_at: 0,
        };
        let mut value = serde_json::to_value(presence).unwrap_or_default();
        if let Some(fields) = value.as_object_mut() {
            fields.insert("updatedAt".into(), server_timestamp());
        }
        value
    }

    /// One tick: publish if the tracker says so.
    async fn tick(&self, now_ms: i64, keepalive_ms: i64) {
        let _guard = self.write_lock.lock().await;
        let world = {
            let mut tracker = self.tracker();
            let Some(world) = tracker.poll(now_ms, keepalive_ms) else {
                return;
            };
            tracker.mark_sent(now_ms);
            world
        };
        if let Err(e) = self.store.set(&self.slot, self.record(world)).await {
            debug!(slot = %self.slot, error = %e, "presence: publish failed");
        }
    }

    async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.store.delete(&self.slot).await {
            warn!(slot = %self.slot, error = %e, "presence: delete failed");
        }
    }
}

impl PresenceBroadcaster {
    /// Register the disconnect cleanup and start the tick loop.
    pub async fn spawn(store: Arc<dyn RealtimeStore>, board_id: &str, viewer: Viewer, config: &CanvasConfig) -> Self {
        let slot = CollectionPath::cursors(board_id).entry(viewer.id.clone());
        if let Err(e) = store.on_disconnect_delete(&slot).await {
            warn!(%slot, error = %e, "presence: on-disconnect registration failed");
        }

        let shared = Arc::new(Shared {
            store,
            slot,
            viewer,
            tracker: Mutex::new(PointerTracker::new()),
            write_lock: tokio::sync::Mutex::new(()),
        });
        let task = tokio::spawn(run(Arc::clone(&shared), config.presence_tick, config.keepalive_ms()));
        debug!(slot = %shared.slot, "presence: broadcaster started");
        Self { shared, task }
    }

    /// Pointer entered, moved or pressed inside the surface.
    pub fn pointer_moved(&self, world: Point) {
        self.shared.tracker().pointer_at(world);
    }

    /// Pointer left the surface (or was cancelled). Deletes the slot now.
    pub async fn pointer_left(&self) {
        if self.shared.tracker().leave() {
            self.shared.clear().await;
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.tracker().is_active()
    }

    /// Stop the loop and clear the slot.
    pub async fn shutdown(self) {
        self.task.abort();
        self.shared.tracker().leave();
        self.shared.clear().await;
    }
}

impl Drop for PresenceBroadcaster {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(shared: Arc<Shared>, tick: std::time::Duration, keepalive_ms: i64) {
    let started = Instant::now();
    let mut interval = tokio::time::interval(tick.max(std::time::Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let now_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        shared.tick(now_ms, keepalive_ms).await;
    }
}
