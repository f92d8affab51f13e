//! Board element store adapter.
//!
//! DESIGN
//! ======
//! The only path by which element changes become durable, and the only
//! place that knows the stored shape of an element:
//!
//! ```text
//! boards/{board}/elements/{id} = {
//!     "x", "y", "w", "h",          world pixels
//!     "payload": { ... },           task content, opaque here
//!     "createdAt", "updatedAt"      server clock, ms since epoch
//! }
//! ```
//!
//! Updates are partial merges of one field group (position, size or
//! content) plus `updatedAt`. Concurrent editors touching different groups
//! never clobber each other; the same group is last-write-wins.
//!
//! Snapshots are decoded into `BoardElement`s sorted by creation time (ties
//! by id) so every client stacks elements identically. An entry that fails
//! to decode is skipped and logged rather than poisoning the whole board.

#[cfg(test)]
#[path = "elements_test.rs"]
mod elements_test;

use std::sync::Arc;

use canvas::camera::Point;
use canvas::consts::{DEFAULT_ELEMENT_HEIGHT, DEFAULT_ELEMENT_WIDTH};
use canvas::doc::{BoardElement, ElementId, TaskPayload, stacking_order};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::store::{CollectionPath, RealtimeStore, Snapshot, StoreError, Subscription, server_timestamp};

// =============================================================================
// WIRE FORMAT
// =============================================================================

const FIELD_UPDATED_AT: &str = "updatedAt";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredElement {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    #[serde(default)]
    payload: TaskPayload,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
}

impl StoredElement {
    fn into_element(self, id: &str) -> BoardElement {
        BoardElement {
            id: id.to_string(),
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
            payload: self.payload,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Decode a collection snapshot into stacking order.
#[must_use]
pub fn decode_snapshot(snapshot: &Snapshot) -> Vec<BoardElement> {
    let mut elements: Vec<BoardElement> = snapshot
        .iter()
        .filter_map(|(id, value)| match StoredElement::deserialize(value) {
            Ok(stored) => Some(stored.into_element(id)),
            Err(e) => {
                warn!(element_id = %id, error = %e, "elements: skipping malformed entry");
                None
            }
        })
        .collect();
    elements.sort_by(stacking_order);
    elements
}

/// Initial properties of an element about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewElement {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub payload: TaskPayload,
}

impl NewElement {
    /// Default-sized element with its top-left corner at `world`.
    #[must_use]
    pub fn at(world: Point, payload: TaskPayload) -> Self {
        Self { x: world.x, y: world.y, w: DEFAULT_ELEMENT_WIDTH, h: DEFAULT_ELEMENT_HEIGHT, payload }
    }

    fn to_value(&self) -> Result<Value, StoreError> {
        let payload = serde_json::to_value(&self.payload).map_err(|e| StoreError::InvalidValue(e.to_string()))?;
        Ok(json!({
            "x": self.x,
            "y": self.y,
            "w": self.w,
            "h": self.h,
            "payload": payload,
            "createdAt": server_timestamp(),
            "updatedAt": server_timestamp(),
        }))
    }
}

// =============================================================================
// FEED
// =============================================================================

/// Live, decoded view of a board's elements.
#[derive(Debug)]
pub struct ElementFeed {
    subscription: Subscription,
}

impl ElementFeed {
    /// Latest element list, whether or not it was already observed.
    #[must_use]
    pub fn current(&self) -> Vec<BoardElement> {
        decode_snapshot(&self.subscription.current())
    }

    /// Wait for the next unseen element list. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<BoardElement>> {
        self.subscription.next().await.map(|snap| decode_snapshot(&snap))
    }

    /// The newest unseen element list, without waiting.
    pub fn try_next(&mut self) -> Option<Vec<BoardElement>> {
        self.subscription.try_next().map(|snap| decode_snapshot(&snap))
    }
}

// =============================================================================
// ADAPTER
// =============================================================================

/// Element reads and writes for one board.
#[derive(Clone)]
pub struct ElementStore {
    store: Arc<dyn RealtimeStore>,
    board_id: String,
    collection: CollectionPath,
}

impl ElementStore {
    pub fn new(store: Arc<dyn RealtimeStore>, board_id: impl Into<String>) -> Self {
        let board_id = board_id.into();
        let collection = CollectionPath::elements(&board_id);
        Self { store, board_id, collection }
    }

    #[must_use]
    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Subscribe to the board's elements.
    ///
    /// # Errors
    ///
    /// Fails when the store rejects the subscription (e.g. disconnected).
    pub async fn subscribe(&self) -> Result<ElementFeed, StoreError> {
        let subscription = self.store.subscribe(&self.collection).await?;
        Ok(ElementFeed { subscription })
    }

    /// Create an element and return its store-assigned id.
    ///
    /// # Errors
    ///
    /// Propagates the store's write error.
    pub async fn create(&self, element: NewElement) -> Result<ElementId, StoreError> {
        let id = self.store.push(&self.collection, element.to_value()?).await?;
        debug!(board_id = %self.board_id, element_id = %id, "elements: created");
        Ok(id)
    }

    /// Persist a new position. Leaves size and content untouched.
    ///
    /// # Errors
    ///
    /// `NotFound` if the element was removed; otherwise the store's error.
    pub async fn update_position(&self, id: &str, x: f64, y: f64) -> Result<(), StoreError> {
        self.merge(id, [("x", json!(x)), ("y", json!(y))]).await
    }

    /// Persist a new size. Leaves position and content untouched.
    ///
    /// # Errors
    ///
    /// `NotFound` if the element was removed; otherwise the store's error.
    pub async fn update_size(&self, id: &str, w: f64, h: f64) -> Result<(), StoreError> {
        self.merge(id, [("w", json!(w)), ("h", json!(h))]).await
    }

    /// Replace the task content. Leaves geometry untouched.
    ///
    /// # Errors
    ///
    /// `NotFound` if the element was removed; otherwise the store's error.
    pub async fn update_content(&self, id: &str, payload: &TaskPayload) -> Result<(), StoreError> {
        let payload = serde_json::to_value(payload).map_err(|e| StoreError::InvalidValue(e.to_string()))?;
        self.merge(id, [("payload", payload)]).await
    }

    /// Delete an element. Subscribers converge to its absence.
    ///
    /// # Errors
    ///
    /// Propagates the store's write error.
    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(&self.collection.entry(id)).await?;
        debug!(board_id = %self.board_id, element_id = %id, "elements: removed");
        Ok(())
    }

    async fn merge<const N: usize>(&self, id: &str, fields: [(&str, Value); N]) -> Result<(), StoreError> {
        let mut patch: Map<String, Value> = fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        patch.insert(FIELD_UPDATED_AT.into(), server_timestamp());
        self.store.merge(&self.collection.entry(id), patch).await
    }
}
