//! Interactive board surface — the mounted canvas for one viewer.
//!
//! ARCHITECTURE
//! ============
//! `BoardSurface` composes the synchronous `EngineCore` with the async
//! collaborators of one board:
//!
//! ```text
//! pointer/wheel ──► EngineCore ──► Action ──► ElementStore (spawned, retried)
//!        │
//!        └────────► PresenceBroadcaster (tick loop)
//!
//! frame(dt) ◄── ElementFeed (latest snapshot) + PresenceSubscriber (eased)
//! ```
//!
//! DESIGN
//! ======
//! - Input handlers return the engine's actions so the host can capture or
//!   release the pointer, but never return store errors. Durable writes run
//!   in spawned tasks through the retry policy; the optimistic local state
//!   already shows the result.
//! - Explicit content operations (`add_element`, `edit_content`) do return
//!   their errors: the user is waiting on them.
//! - Durable writes to one field group (position or size) of one element
//!   are ordered: each waits its turn and skips itself once a newer write
//!   for the same group was requested. A retried write therefore never
//!   lands over a newer one.
//! - An element removed locally stays hidden from incoming snapshots until
//!   its delete lands or gives up.
//! - Mount subscribes, unmount flushes and clears presence. Dropping the
//!   surface without unmounting aborts in-flight writes and leaves presence
//!   cleanup to the store's on-disconnect directive.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use canvas::camera::{Camera, Point};
use canvas::consts::{DEFAULT_ELEMENT_HEIGHT, DEFAULT_ELEMENT_WIDTH};
use canvas::doc::{BoardElement, ElementId, TaskPayload};
use canvas::engine::{Action, EngineCore};
use canvas::input::{Button, WheelDelta};
use canvas::render::{Scene, build_scene};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::CanvasConfig;
use crate::elements::{ElementFeed, ElementStore, NewElement};
use crate::presence::{PresenceBroadcaster, PresenceSubscriber, Viewer};
use crate::retry::{RetryPolicy, persist_with_retry};
use crate::store::{ConnectionStatus, RealtimeStore, StoreError};

// =============================================================================
// PENDING WRITES
// =============================================================================

/// Element fields persisted together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FieldGroup {
    Position,
    Size,
}

impl FieldGroup {
    fn label(self) -> &'static str {
        match self {
            Self::Position => "update_position",
            Self::Size => "update_size",
        }
    }
}

/// Write ordering for one (element, field group).
#[derive(Default)]
struct WriteSlot {
    /// Generation of the newest requested write.
    latest: AtomicU64,
    /// Held by the write currently talking to the store.
    turn: tokio::sync::Mutex<()>,
}

impl WriteSlot {
    fn is_latest(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }
}

type WriteKey = (ElementId, FieldGroup);

/// Bookkeeping shared with persistence tasks.
#[derive(Clone, Default)]
struct PendingWrites {
    slots: Arc<Mutex<HashMap<WriteKey, Arc<WriteSlot>>>>,
    removals: Arc<Mutex<HashSet<ElementId>>>,
}

impl PendingWrites {
    fn slots(&self) -> MutexGuard<'_, HashMap<WriteKey, Arc<WriteSlot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn removals(&self) -> MutexGuard<'_, HashSet<ElementId>> {
        self.removals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new write for `key`, superseding any older one.
    fn claim(&self, key: &WriteKey) -> (Arc<WriteSlot>, u64) {
        let mut slots = self.slots();
        let slot = Arc::clone(slots.entry(key.clone()).or_default());
        let generation = slot.latest.fetch_add(1, Ordering::SeqCst) + 1;
        (slot, generation)
    }

    /// Forget the slot once its newest write has finished.
    fn release(&self, key: &WriteKey, slot: &Arc<WriteSlot>, generation: u64) {
        let mut slots = self.slots();
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) && slot.is_latest(generation) {
            slots.remove(key);
        }
    }

    fn begin_removal(&self, id: &str) {
        self.removals().insert(id.to_string());
    }

    fn end_removal(&self, id: &str) {
        self.removals().remove(id);
    }

    fn hide_removed(&self, elements: &mut Vec<BoardElement>) {
        let removals = self.removals();
        if !removals.is_empty() {
            elements.retain(|el| !removals.contains(&el.id));
        }
    }
}

// =============================================================================
// SURFACE
// =============================================================================

pub struct BoardSurface {
    core: EngineCore,
    elements: ElementStore,
    feed: ElementFeed,
    broadcaster: PresenceBroadcaster,
    presence: PresenceSubscriber,
    retry: RetryPolicy,
    in_flight: JoinSet<()>,
    pending: PendingWrites,
    status: watch::Receiver<ConnectionStatus>,
}

impl BoardSurface {
    /// Subscribe to the board's elements and cursors and start presence.
    ///
    /// # Errors
    ///
    /// Fails when either subscription is rejected by the store.
    pub async fn mount(
        store: Arc<dyn RealtimeStore>,
        board_id: &str,
        viewer: Viewer,
        config: &CanvasConfig,
    ) -> Result<Self, StoreError> {
        let elements = ElementStore::new(Arc::clone(&store), board_id);
        let feed = elements.subscribe().await?;
        let presence = PresenceSubscriber::subscribe(Arc::clone(&store), board_id, viewer.id.clone(), config).await?;
        let status = store.connection_status();
        let viewer_id = viewer.id.clone();
        let broadcaster = PresenceBroadcaster::spawn(store, board_id, viewer, config).await;

        let mut surface = Self {
            core: EngineCore::new(config.bounds),
            elements,
            feed,
            broadcaster,
            presence,
            retry: config.retry,
            in_flight: JoinSet::new(),
            pending: PendingWrites::default(),
            status,
        };
        surface.sync();
        info!(%board_id, %viewer_id, elements = surface.core.doc.len(), "surface: mounted");
        Ok(surface)
    }

    /// Host viewport size in CSS pixels.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.core.set_viewport(width, height);
    }

    /// Apply the newest element snapshot, if one arrived. Returns whether
    /// the document changed.
    pub fn sync(&mut self) -> bool {
        let Some(mut elements) = self.feed.try_next() else {
            return false;
        };
        self.pending.hide_removed(&mut elements);
        self.core.apply_snapshot(elements);
        true
    }

    // --- Input ---

    pub fn pointer_down(&mut self, screen: Point, button: Button) -> Vec<Action> {
        let actions = self.core.on_pointer_down(screen, button);
        self.track_pointer(screen);
        self.dispatch(&actions);
        actions
    }

    pub fn pointer_move(&mut self, screen: Point) -> Vec<Action> {
        let actions = self.core.on_pointer_move(screen);
        self.track_pointer(screen);
        actions
    }

    pub fn pointer_up(&mut self, screen: Point) -> Vec<Action> {
        let actions = self.core.on_pointer_up(screen);
        self.track_pointer(screen);
        self.dispatch(&actions);
        actions
    }

    /// The platform took the pointer away. Ends any gesture and clears the
    /// viewer's cursor.
    pub async fn pointer_cancel(&mut self) -> Vec<Action> {
        let actions = self.core.on_pointer_cancel();
        self.dispatch(&actions);
        self.broadcaster.pointer_left().await;
        actions
    }

    /// Pointer left the surface. Gestures continue under pointer capture.
    pub async fn pointer_leave(&mut self) {
        self.broadcaster.pointer_left().await;
    }

    pub fn wheel(&mut self, screen: Point, delta: WheelDelta) -> Vec<Action> {
        self.core.on_wheel(screen, delta)
    }

    // --- Content ---

    /// Create a default-sized element with its top-left corner at `world`.
    ///
    /// # Errors
    ///
    /// Propagates the store's write error.
    pub async fn add_element(&mut self, payload: TaskPayload, world: Point) -> Result<ElementId, StoreError> {
        let (w, h) = self.core.bounds.clamp_size(DEFAULT_ELEMENT_WIDTH, DEFAULT_ELEMENT_HEIGHT);
        let element = NewElement { x: world.x.round(), y: world.y.round(), w, h, payload };
        self.elements.create(element).await
    }

    /// Create an element centred in the current viewport.
    ///
    /// # Errors
    ///
    /// Propagates the store's write error.
    pub async fn quick_drop(&mut self, payload: TaskPayload) -> Result<ElementId, StoreError> {
        let (w, h) = self.core.bounds.clamp_size(DEFAULT_ELEMENT_WIDTH, DEFAULT_ELEMENT_HEIGHT);
        let center = self.core.world_center();
        self.add_element(payload, Point::new(center.x - w / 2.0, center.y - h / 2.0)).await
    }

    /// Replace an element's task content.
    ///
    /// # Errors
    ///
    /// `NotFound` if the element is gone; otherwise the store's error.
    pub async fn edit_content(&mut self, id: &str, payload: &TaskPayload) -> Result<(), StoreError> {
        self.elements.update_content(id, payload).await
    }

    /// Remove an element: locally now, durably in the background.
    pub fn remove_element(&mut self, id: &str) {
        self.core.apply_remove(id);
        self.pending.begin_removal(id);
        let (elements, pending, policy) = (self.elements.clone(), self.pending.clone(), self.retry);
        let id = id.to_string();
        self.in_flight.spawn(async move {
            persist_with_retry(&policy, "remove", || elements.remove(&id)).await;
            pending.end_removal(&id);
        });
    }

    // --- Frame ---

    /// Build the next frame: latest elements, eased cursors, live camera.
    pub fn frame(&mut self, dt_ms: f64) -> Scene {
        self.sync();
        let cursors = self.presence.frame(dt_ms);
        build_scene(&self.core, cursors)
    }

    // --- Queries ---

    #[must_use]
    pub fn core(&self) -> &EngineCore {
        &self.core
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.core.camera()
    }

    /// Drives a passive "connection lost" banner.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    // --- Lifecycle ---

    /// Wait for every in-flight durable write to land or give up.
    pub async fn flush(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "surface: persistence task failed");
            }
        }
    }

    /// Flush pending writes, stop presence and clear the viewer's cursor.
    pub async fn unmount(mut self) {
        self.flush().await;
        self.broadcaster.shutdown().await;
        info!(board_id = %self.elements.board_id(), "surface: unmounted");
    }

    // --- Internals ---

    fn track_pointer(&self, screen: Point) {
        self.broadcaster.pointer_moved(self.core.camera.screen_to_world(screen));
    }

    fn dispatch(&mut self, actions: &[Action]) {
        while self.in_flight.try_join_next().is_some() {}

        for action in actions {
            match action {
                Action::PersistPosition { id, x, y } => {
                    let (elements, target, x, y) = (self.elements.clone(), id.clone(), *x, *y);
                    debug!(element_id = %id, x, y, "surface: persist position");
                    self.persist_ordered(id, FieldGroup::Position, move || {
                        let (elements, target) = (elements.clone(), target.clone());
                        async move { elements.update_position(&target, x, y).await }
                    });
                }
                Action::PersistSize { id, w, h } => {
                    let (elements, target, w, h) = (self.elements.clone(), id.clone(), *w, *h);
                    debug!(element_id = %id, w, h, "surface: persist size");
                    self.persist_ordered(id, FieldGroup::Size, move || {
                        let (elements, target) = (elements.clone(), target.clone());
                        async move { elements.update_size(&target, w, h).await }
                    });
                }
                Action::RemoveRequested { id } => self.remove_element(id),
                Action::CapturePointer | Action::ReleasePointer | Action::RenderNeeded => {}
            }
        }
    }

    /// Persist one field group of `id` behind any earlier write to it.
    /// Superseded writes, queued or between retries, stop without writing.
    fn persist_ordered<W, Fut>(&mut self, id: &str, group: FieldGroup, write: W)
    where
        W: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let key: WriteKey = (id.to_string(), group);
        let (slot, generation) = self.pending.claim(&key);
        let (pending, policy) = (self.pending.clone(), self.retry);
        self.in_flight.spawn(async move {
            {
                let _turn = slot.turn.lock().await;
                persist_with_retry(&policy, group.label(), || {
                    let current = slot.is_latest(generation);
                    if !current {
                        debug!(element_id = %key.0, ?group, "surface: write superseded");
                    }
                    let attempt = write();
                    async move { if current { attempt.await } else { Ok(()) } }
                })
                .await;
            }
            pending.release(&key, &slot, generation);
        });
    }
}
