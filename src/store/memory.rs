//! In-process realtime store.
//!
//! DESIGN
//! ======
//! `MemoryStore` plays the server: it owns every collection and fans each
//! committed write out to subscribers through a `watch` channel per
//! collection. Clients reach it through a [`MemoryConnection`], which is the
//! [`RealtimeStore`] implementation handed to board components.
//!
//! A connection owns its on-disconnect directives. Calling
//! [`MemoryConnection::disconnect`] or simply dropping the connection (the
//! ungraceful case: tab closed, socket lost) runs them against the store, so
//! cleanup never depends on the client cooperating.
//!
//! LOCKING
//! =======
//! A single `std::sync::Mutex` guards all collections. Critical sections are
//! short and never cross an `.await`, and `Drop` must be able to run the
//! directives synchronously.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    CollectionPath, ConnectionStatus, EntryPath, RealtimeStore, Snapshot, StoreError, Subscription,
    resolve_server_values,
};
use crate::frame::now_ms;

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

// =============================================================================
// STORE
// =============================================================================

struct Collection {
    entries: BTreeMap<String, Value>,
    tx: watch::Sender<Snapshot>,
}

impl Collection {
    fn new() -> Self {
        let (tx, _) = watch::channel(Snapshot::default());
        Self { entries: BTreeMap::new(), tx }
    }

    fn publish(&self) {
        self.tx.send_replace(Snapshot::new(self.entries.clone()));
    }
}

#[derive(Default)]
struct StoreInner {
    collections: HashMap<CollectionPath, Collection>,
}

impl StoreInner {
    fn collection(&mut self, path: &CollectionPath) -> &mut Collection {
        self.collections.entry(path.clone()).or_insert_with(Collection::new)
    }

    fn remove_entry(&mut self, path: &EntryPath) -> bool {
        let Some(collection) = self.collections.get_mut(path.collection()) else {
            return false;
        };
        if collection.entries.remove(path.key()).is_none() {
            return false;
        }
        collection.publish();
        true
    }
}

/// Shared in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
    next_connection: Arc<AtomicU64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a client connection.
    #[must_use]
    pub fn connect(&self) -> MemoryConnection {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed) + 1;
        let (status, _) = watch::channel(ConnectionStatus::Connected);
        info!(connection = id, "store: connection opened");
        MemoryConnection { id, store: self.clone(), directives: Mutex::new(Vec::new()), status }
    }

    /// Read a collection directly, bypassing any connection.
    #[must_use]
    pub fn snapshot(&self, collection: &CollectionPath) -> Snapshot {
        let inner = self.lock();
        inner
            .collections
            .get(collection)
            .map(|c| Snapshot::new(c.entries.clone()))
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, collection: &CollectionPath) -> Subscription {
        let mut inner = self.lock();
        Subscription::new(inner.collection(collection).tx.subscribe())
    }

    fn push(&self, collection: &CollectionPath, value: Value) -> String {
        let key = Uuid::new_v4().to_string();
        let value = resolve_server_values(value, now_ms());
        let mut inner = self.lock();
        let target = inner.collection(collection);
        target.entries.insert(key.clone(), value);
        target.publish();
        key
    }

    fn set(&self, path: &EntryPath, value: Value) {
        if value.is_null() {
            self.delete(path);
            return;
        }
        let value = resolve_server_values(value, now_ms());
        let mut inner = self.lock();
        let target = inner.collection(path.collection());
        target.entries.insert(path.key().to_string(), value);
        target.publish();
    }

    fn merge(&self, path: &EntryPath, patch: Map<String, Value>) -> Result<(), StoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let target = inner.collection(path.collection());
        let Some(entry) = target.entries.get_mut(path.key()) else {
            return Err(StoreError::NotFound(path.to_string()));
        };
        let Value::Object(fields) = entry else {
            return Err(StoreError::InvalidValue(format!("{path} is not an object")));
        };
        for (key, value) in patch {
            if value.is_null() {
                fields.remove(&key);
            } else {
                fields.insert(key, resolve_server_values(value, now));
            }
        }
        target.publish();
        Ok(())
    }

    fn delete(&self, path: &EntryPath) -> bool {
        self.lock().remove_entry(path)
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

/// One client's session with a [`MemoryStore`].
pub struct MemoryConnection {
    id: u64,
    store: MemoryStore,
    directives: Mutex<Vec<EntryPath>>,
    status: watch::Sender<ConnectionStatus>,
}

impl MemoryConnection {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.status.borrow() == ConnectionStatus::Connected
    }

    /// Close the session and run its on-disconnect directives. Idempotent.
    pub fn disconnect(&self) {
        let was_connected = self.status.send_replace(ConnectionStatus::Disconnected) == ConnectionStatus::Connected;
        if !was_connected {
            return;
        }
        let directives = std::mem::take(&mut *self.directives.lock().unwrap_or_else(PoisonError::into_inner));
        let mut removed = 0usize;
        for path in &directives {
            if self.store.delete(path) {
                removed += 1;
            }
        }
        info!(connection = self.id, directives = directives.len(), removed, "store: connection closed");
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.is_connected() { Ok(()) } else { Err(StoreError::Disconnected) }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[async_trait]
impl RealtimeStore for MemoryConnection {
    async fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription, StoreError> {
        self.ensure_connected()?;
        debug!(connection = self.id, %collection, "store: subscribe");
        Ok(self.store.subscribe(collection))
    }

    async fn push(&self, collection: &CollectionPath, value: Value) -> Result<String, StoreError> {
        self.ensure_connected()?;
        Ok(self.store.push(collection, value))
    }

    async fn set(&self, path: &EntryPath, value: Value) -> Result<(), StoreError> {
        self.ensure_connected()?;
        self.store.set(path, value);
        Ok(())
    }

    async fn merge(&self, path: &EntryPath, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.ensure_connected()?;
        self.store.merge(path, patch)
    }

    async fn delete(&self, path: &EntryPath) -> Result<(), StoreError> {
        self.ensure_connected()?;
        self.store.delete(path);
        Ok(())
    }

    async fn on_disconnect_delete(&self, path: &EntryPath) -> Result<(), StoreError> {
        self.ensure_connected()?;
        let mut directives = self.directives.lock().unwrap_or_else(PoisonError::into_inner);
        if !directives.contains(path) {
            directives.push(path.clone());
        }
        Ok(())
    }

    fn connection_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }
}
