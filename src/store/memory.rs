//! In-process document store backed by a mutex-guarded map
//!
//! Good enough for a single-deployment service: every write is a
//! read-modify-write under one lock, which also publishes to the change
//! feed before the lock is released. That gives the ordered, gap-free
//! delivery the timer subscription relies on.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

use super::{DocWatch, DocumentStore, StoreError, SERVER_TIMESTAMP};
use crate::timer::math::now_ms;

const FEED_CAPACITY: usize = 256;

#[derive(Default)]
struct Inner {
    docs: HashMap<String, Value>,
    feeds: HashMap<String, broadcast::Sender<Option<Value>>>,
}

/// Last-write-wins in-memory store.
pub struct MemoryDocStore {
    inner: Mutex<Inner>,
}

impl MemoryDocStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("store lock poisoned: {}", e)))
    }

    fn commit(inner: &mut Inner, key: &str, doc: Value) {
        inner.docs.insert(key.to_string(), doc.clone());
        if let Some(feed) = inner.feeds.get(key) {
            // No receivers is fine; the write still stands.
            let _ = feed.send(Some(doc));
        }
        debug!("committed write to document {:?}", key);
    }
}

impl Default for MemoryDocStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold the top-level fields of `fields` into `target`, resolving the
/// server-timestamp sentinel. Explicit nulls are kept, they clear a field
/// rather than removing the key.
fn merge_fields(target: &mut Value, fields: Value) {
    let now = now_ms();
    if let (Value::Object(existing), Value::Object(incoming)) = (target, fields) {
        for (name, value) in incoming {
            existing.insert(name, resolve_timestamp(value, now));
        }
    }
}

fn resolve_timestamp(value: Value, now: i64) -> Value {
    match value {
        Value::String(ref s) if s == SERVER_TIMESTAMP => json!(now),
        other => other,
    }
}

#[async_trait]
impl DocumentStore for MemoryDocStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.lock()?.docs.get(key).cloned())
    }

    async fn set(&self, key: &str, fields: Value, merge: bool) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let doc = if merge {
            let mut doc = inner.docs.get(key).cloned().unwrap_or_else(|| json!({}));
            merge_fields(&mut doc, fields);
            doc
        } else {
            let mut doc = json!({});
            merge_fields(&mut doc, fields);
            doc
        };
        Self::commit(&mut inner, key, doc);
        Ok(())
    }

    async fn update(&self, key: &str, fields: Value) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let mut doc = match inner.docs.get(key).cloned() {
            Some(doc) => doc,
            None => return Err(StoreError::Missing(key.to_string())),
        };
        merge_fields(&mut doc, fields);
        Self::commit(&mut inner, key, doc);
        Ok(())
    }

    async fn watch(&self, key: &str) -> Result<DocWatch, StoreError> {
        let mut inner = self.lock()?;
        let snapshot = inner.docs.get(key).cloned();
        let feed = inner
            .feeds
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0);
        Ok(DocWatch::new(snapshot, feed.subscribe()))
    }
}
