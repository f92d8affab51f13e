//! Realtime store — keyed JSON collections with live subscriptions.
//!
//! DESIGN
//! ======
//! Every board lives under two collections:
//!
//! - `boards/{board}/elements`: durable task cards, one entry per element.
//! - `boards/{board}/presence/cursors`: one ephemeral entry per viewer.
//!
//! Components never reach for a global handle. They receive an
//! `Arc<dyn RealtimeStore>` at construction, so tests and the relay can hand
//! them an in-process [`MemoryStore`] connection.
//!
//! SUBSCRIPTIONS
//! =============
//! A [`Subscription`] yields immutable [`Snapshot`]s of a whole collection.
//! Delivery is latest-wins: a slow reader skips intermediate states and
//! always observes the newest one. Dropping the handle unsubscribes.
//!
//! SERVER VALUES
//! =============
//! Writers cannot trust their own clocks for `createdAt`/`updatedAt`.
//! [`server_timestamp`] produces a sentinel that the store replaces with its
//! own clock when the write is applied.

pub mod memory;


#[cfg(test)]
pub(crate) mod test_helpers;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::frame::ErrorCode;

pub use memory::{MemoryConnection, MemoryStore};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("store connection is closed")]
    Disconnected,
    #[error("entry not found: {0}")]
    NotFound(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Disconnected => "E_STORE_DISCONNECTED",
            Self::NotFound(_) => "E_STORE_NOT_FOUND",
            Self::InvalidValue(_) => "E_STORE_INVALID_VALUE",
            Self::Unavailable(_) => "E_STORE_UNAVAILABLE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Unavailable(_))
    }
}

// =============================================================================
// PATHS
// =============================================================================

/// Path of a keyed collection, e.g. `boards/b1/elements`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    #[must_use]
    pub fn elements(board_id: &str) -> Self {
        Self(format!("boards/{board_id}/elements"))
    }

    #[must_use]
    pub fn cursors(board_id: &str) -> Self {
        Self(format!("boards/{board_id}/presence/cursors"))
    }

    /// Parse a client-supplied path. Segments must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for an empty path or an empty segment.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let raw = raw.trim_matches('/');
        if raw.is_empty() || raw.split('/').any(str::is_empty) {
            return Err(StoreError::InvalidValue(format!("bad collection path {raw:?}")));
        }
        Ok(Self(raw.to_string()))
    }

    /// Entry `key` inside this collection.
    #[must_use]
    pub fn entry(&self, key: impl Into<String>) -> EntryPath {
        EntryPath { collection: self.clone(), key: key.into() }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of one entry: a collection plus a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryPath {
    collection: CollectionPath,
    key: String,
}

impl EntryPath {
    /// Parse `collection/.../key`. The last segment is the key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` when there is no collection part or any
    /// segment is empty.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim_matches('/');
        let Some((collection, key)) = trimmed.rsplit_once('/') else {
            return Err(StoreError::InvalidValue(format!("bad entry path {raw:?}")));
        };
        if key.is_empty() {
            return Err(StoreError::InvalidValue(format!("bad entry path {raw:?}")));
        }
        Ok(CollectionPath::parse(collection)?.entry(key))
    }

    #[must_use]
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

// =============================================================================
// SERVER VALUES
// =============================================================================

const SERVER_VALUE_KEY: &str = ".sv";
const SERVER_VALUE_TIMESTAMP: &str = "timestamp";

/// Placeholder resolved to the store's clock (ms since epoch) on write.
#[must_use]
pub fn server_timestamp() -> Value {
    let mut map = Map::new();
    map.insert(SERVER_VALUE_KEY.into(), Value::String(SERVER_VALUE_TIMESTAMP.into()));
    Value::Object(map)
}

/// Replace every server-timestamp placeholder inside `value` with `now_ms`.
#[must_use]
pub fn resolve_server_values(value: Value, now_ms: i64) -> Value {
    match value {
        Value::Object(map) if is_server_timestamp(&map) => Value::from(now_ms),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, resolve_server_values(v, now_ms))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(|v| resolve_server_values(v, now_ms)).collect()),
        other => other,
    }
}

fn is_server_timestamp(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.get(SERVER_VALUE_KEY).and_then(Value::as_str) == Some(SERVER_VALUE_TIMESTAMP)
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Immutable view of a collection at one instant. Cheap to clone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Arc<BTreeMap<String, Value>>,
}

impl Snapshot {
    #[must_use]
    pub fn new(entries: BTreeMap<String, Value>) -> Self {
        Self { entries: Arc::new(entries) }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The whole collection as one JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

/// Live handle on a collection. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
}

impl Subscription {
    /// Wrap a receiver. The value current at subscribe time counts as unseen,
    /// so the first [`Subscription::next`] yields it immediately.
    #[must_use]
    pub fn new(mut rx: watch::Receiver<Snapshot>) -> Self {
        rx.mark_changed();
        Self { rx }
    }

    /// Latest snapshot, without marking it seen.
    #[must_use]
    pub fn current(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// Wait for a snapshot not yet observed. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// The newest unseen snapshot, if one arrived since the last read.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            Ok(false) | Err(_) => None,
        }
    }

    /// Consume the handle as a stream of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = Snapshot> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move { sub.next().await.map(|snap| (snap, sub)) })
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Connection state as reported by the store client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// A client's view of the realtime store.
///
/// Writes are atomic per call. `merge` is a shallow field merge: each key in
/// the patch replaces the stored field, `null` removes it, and untouched
/// fields survive. That is what lets position, size and content be edited
/// concurrently without clobbering each other.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Subscribe to a collection.
    async fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription, StoreError>;

    /// Append `value` under a fresh store-assigned key and return the key.
    async fn push(&self, collection: &CollectionPath, value: Value) -> Result<String, StoreError>;

    /// Overwrite one entry. A `null` value deletes it.
    async fn set(&self, path: &EntryPath, value: Value) -> Result<(), StoreError>;

    /// Shallow-merge `patch` into an existing entry.
    ///
    /// Fails with `NotFound` when the entry is absent, so a late write can
    /// never resurrect a removed element.
    async fn merge(&self, path: &EntryPath, patch: Map<String, Value>) -> Result<(), StoreError>;

    /// Remove one entry. Removing an absent entry succeeds.
    async fn delete(&self, path: &EntryPath) -> Result<(), StoreError>;

    /// Ask the store to delete `path` when this connection drops, gracefully
    /// or not. Runs server side; the client need not be alive.
    async fn on_disconnect_delete(&self, path: &EntryPath) -> Result<(), StoreError>;

    /// Watch the connection state, e.g. to drive a "connection lost" banner.
    fn connection_status(&self) -> watch::Receiver<ConnectionStatus>;
}
