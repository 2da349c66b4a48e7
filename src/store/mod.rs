//! Keyed document store abstraction
//!
//! The timer core persists a single JSON-shaped document and does not care
//! where it lives. This module defines the seam: point reads, whole or
//! merged writes, partial updates, and an ordered change feed per key. The
//! in-process implementation lives in [`memory`]; a durable backend would
//! implement the same trait.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

pub use memory::MemoryDocStore;

/// Sentinel value a writer may place in a top-level field; the store
/// replaces it with its own clock (epoch milliseconds) at commit time.
pub const SERVER_TIMESTAMP: &str = "__serverTimestamp__";

/// Failures surfaced by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not serve the request.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// A partial update targeted a document that does not exist.
    #[error("no document at key {0:?}")]
    Missing(String),
}

/// A keyed single-document store with last-write-wins semantics.
///
/// Each write is atomic with respect to the per-key change feed: observers
/// see committed document states in commit order, with nothing skipped
/// between the snapshot handed out by [`watch`](DocumentStore::watch) and
/// the first fed update.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Read the current contents of a document, if it exists.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a document. With `merge` set, top-level fields are folded into
    /// the existing contents (creating the document if absent); otherwise
    /// the document is replaced wholesale.
    async fn set(&self, key: &str, fields: Value, merge: bool) -> Result<(), StoreError>;

    /// Merge fields into an existing document; fails with
    /// [`StoreError::Missing`] if there is nothing to update.
    async fn update(&self, key: &str, fields: Value) -> Result<(), StoreError>;

    /// Open a change feed on a document: the current contents (or `None`)
    /// are captured atomically with the subscription, so no committed write
    /// can fall into a gap.
    async fn watch(&self, key: &str) -> Result<DocWatch, StoreError>;
}

/// Handle on a document change feed.
///
/// Dropping the handle unsubscribes; the store keeps committing writes
/// regardless of who is listening.
pub struct DocWatch {
    initial: Option<Option<Value>>,
    rx: broadcast::Receiver<Option<Value>>,
}

impl DocWatch {
    pub(crate) fn new(snapshot: Option<Value>, rx: broadcast::Receiver<Option<Value>>) -> Self {
        Self {
            initial: Some(snapshot),
            rx,
        }
    }

    /// Next document state: the subscription-time snapshot first, then each
    /// committed write in order. `None` means the feed is closed.
    pub async fn next(&mut self) -> Option<Option<Value>> {
        if let Some(snapshot) = self.initial.take() {
            return Some(snapshot);
        }
        loop {
            match self.rx.recv().await {
                Ok(doc) => return Some(doc),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // A slow observer only loses intermediate states; the
                    // next delivered state is still the latest committed one.
                    warn!("document feed lagged, skipped {} updates", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
