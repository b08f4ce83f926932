//! Document store seam

use crate::error::{BackendError, BackendResult};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Document database keyed by collection and id
pub trait DocumentStore: Send + Sync {
    /// Fetch a document
    fn get(&self, collection: &str, id: &str) -> BackendResult<Option<Value>>;

    /// Create or replace a document
    fn put(&self, collection: &str, id: &str, document: Value) -> BackendResult<()>;

    /// Append entries to a document's log. Returns the new log length.
    fn append(&self, collection: &str, id: &str, entries: &[Value]) -> BackendResult<usize>;
}

impl dyn DocumentStore {
    /// Fetch and decode a document
    pub fn get_as<T: DeserializeOwned>(&self, collection: &str, id: &str) -> BackendResult<Option<T>> {
        match self.get(collection, id)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Encode and store a document
    pub fn put_as<T: Serialize>(&self, collection: &str, id: &str, document: &T) -> BackendResult<()> {
        self.put(collection, id, serde_json::to_value(document)?)
    }
}

fn key(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, id)
}

/// In-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<String, Value>>>,
    logs: Arc<RwLock<HashMap<String, Vec<Value>>>>,
    offline: Arc<AtomicBool>,
    /// Number of upcoming calls that fail
    failures: Arc<AtomicU32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing or regaining the connection
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::Relaxed);
    }

    pub fn is_available(&self) -> bool {
        !self.offline.load(Ordering::Relaxed)
    }

    /// Make the next `count` calls fail
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::Relaxed);
    }

    /// Everything appended to a log
    pub fn log(&self, collection: &str, id: &str) -> Vec<Value> {
        self.logs
            .read()
            .get(&key(collection, id))
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self) -> BackendResult<()> {
        if !self.is_available() {
            return Err(BackendError::Unavailable);
        }
        let injected = self
            .failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        match injected {
            Ok(_) => Err(BackendError::Unavailable),
            Err(_) => Ok(()),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> BackendResult<Option<Value>> {
        self.check()?;
        Ok(self.documents.read().get(&key(collection, id)).cloned())
    }

    fn put(&self, collection: &str, id: &str, document: Value) -> BackendResult<()> {
        self.check()?;
        self.documents.write().insert(key(collection, id), document);
        Ok(())
    }

    fn append(&self, collection: &str, id: &str, entries: &[Value]) -> BackendResult<usize> {
        self.check()?;
        let mut logs = self.logs.write();
        let log = logs.entry(key(collection, id)).or_default();
        log.extend_from_slice(entries);
        Ok(log.len())
    }
}
