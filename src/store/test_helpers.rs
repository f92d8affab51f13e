//! Store doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::{CollectionPath, ConnectionStatus, EntryPath, MemoryConnection, RealtimeStore, StoreError, Subscription};

/// Wraps a real connection and fails queued writes on demand.
pub(crate) struct FlakyStore {
    inner: MemoryConnection,
    failures: Mutex<VecDeque<StoreError>>,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new(inner: MemoryConnection) -> Self {
        Self { inner, failures: Mutex::new(VecDeque::new()), writes: AtomicUsize::new(0) }
    }

    /// The next `times` writes fail with `err`.
    pub(crate) fn fail_next(&self, err: StoreError, times: usize) {
        let mut failures = self.failures.lock().expect("failures lock");
        failures.extend(std::iter::repeat_n(err, times));
    }

    /// Write attempts seen so far, failed ones included.
    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn attempt(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().expect("failures lock").pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RealtimeStore for FlakyStore {
    async fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription, StoreError> {
        self.inner.subscribe(collection).await
    }

    async fn push(&self, collection: &CollectionPath, value: Value) -> Result<String, StoreError> {
        self.attempt()?;
        self.inner.push(collection, value).await
    }

    async fn set(&self, path: &EntryPath, value: Value) -> Result<(), StoreError> {
        self.attempt()?;
        self.inner.set(path, value).await
    }

    async fn merge(&self, path: &EntryPath, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.attempt()?;
        self.inner.merge(path, patch).await
    }

    async fn delete(&self, path: &EntryPath) -> Result<(), StoreError> {
        self.attempt()?;
        self.inner.delete(path).await
    }

    async fn on_disconnect_delete(&self, path: &EntryPath) -> Result<(), StoreError> {
        self.attempt()?;
        self.inner.on_disconnect_delete(path).await
    }

    fn connection_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.connection_status()
    }
}
