//! In-process document store.
//!
//! Keeps every collection in memory and fans change notifications out over a
//! `tokio::sync::broadcast` bus, so watchers see a fresh snapshot after every
//! write. Used for offline sessions and throughout the test suites, which is
//! why it can also be told to fail the next write or disrupt a stream.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bloom_core::ids::DocId;
use futures::StreamExt;
use jiff::{SignedDuration, Timestamp};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::documents::RawDocument;
use crate::error::StorageError;
use crate::store::{BoxFuture, ChangeStream, DocumentStore, Query};

const BUS_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum Change {
    Written { collection: String },
    Disrupted { collection: String, message: String },
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<DocId, RawDocument>>,
    last_timestamp: Option<Timestamp>,
    fail_next_insert: Option<String>,
    fail_next_update: Option<String>,
    write_attempts: usize,
}

impl Inner {
    /// Server clock: never hands out the same timestamp twice.
    fn next_timestamp(&mut self) -> Timestamp {
        let now = Timestamp::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last
                .checked_add(SignedDuration::from_nanos(1))
                .unwrap_or(last),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn snapshot(&self, query: &Query) -> Vec<RawDocument> {
        self.collections
            .get(&query.collection)
            .map(|docs| docs.values().filter(|doc| query.matches(doc)).cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    changes: broadcast::Sender<Change>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: Change) {
        // no watchers is fine
        let _ = self.changes.send(change);
    }

    /// Place a document with a chosen id and timestamp, bypassing the write
    /// path (no fault injection, no write count).
    pub fn seed(&self, collection: &str, doc: RawDocument) {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc);
        self.notify(Change::Written {
            collection: collection.to_string(),
        });
    }

    pub fn get(&self, collection: &str, id: &DocId) -> Option<RawDocument> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Every document of a collection, regardless of owner.
    pub fn all(&self, collection: &str) -> Vec<RawDocument> {
        self.lock()
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Reject the next insert with `message`.
    pub fn fail_next_insert(&self, message: impl Into<String>) {
        self.lock().fail_next_insert = Some(message.into());
    }

    /// Reject the next update with `message`.
    pub fn fail_next_update(&self, message: impl Into<String>) {
        self.lock().fail_next_update = Some(message.into());
    }

    /// Deliver a transport error to every watcher of `collection`.
    pub fn disrupt_stream(&self, collection: &str, message: impl Into<String>) {
        self.notify(Change::Disrupted {
            collection: collection.to_string(),
            message: message.into(),
        });
    }

    /// Inserts and updates attempted so far, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.lock().write_attempts
    }
}

impl DocumentStore for MemoryStore {
    fn list(&self, query: &Query) -> BoxFuture<'_, Result<Vec<RawDocument>, StorageError>> {
        let docs = self.lock().snapshot(query);
        Box::pin(async move { Ok(docs) })
    }

    fn watch(&self, query: &Query) -> ChangeStream {
        // subscribe before the first snapshot so no write falls in between
        let mut changes = self.changes.subscribe();
        let inner = Arc::clone(&self.inner);
        let query = query.clone();

        async_stream::stream! {
            let snapshot = || {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .snapshot(&query)
            };

            yield Ok(snapshot());
            loop {
                match changes.recv().await {
                    Ok(Change::Written { collection }) if collection == query.collection => {
                        yield Ok(snapshot());
                    }
                    Ok(Change::Disrupted { collection, message }) if collection == query.collection => {
                        yield Err(StorageError::StreamDisrupted(message));
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "change bus lagged, resending snapshot");
                        yield Ok(snapshot());
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }

    fn insert(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'_, Result<DocId, StorageError>> {
        let collection = collection.to_string();
        Box::pin(async move {
            let id = {
                let mut inner = self.lock();
                inner.write_attempts += 1;
                if let Some(message) = inner.fail_next_insert.take() {
                    return Err(StorageError::WriteRejected(message));
                }
                let doc = RawDocument {
                    id: DocId::generate(),
                    created_at: Some(inner.next_timestamp()),
                    fields,
                };
                let id = doc.id.clone();
                inner
                    .collections
                    .entry(collection.clone())
                    .or_default()
                    .insert(id.clone(), doc);
                id
            };

            self.notify(Change::Written { collection });
            Ok(id)
        })
    }

    fn update(
        &self,
        collection: &str,
        id: &DocId,
        fields: Map<String, Value>,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        let collection = collection.to_string();
        let id = id.clone();
        Box::pin(async move {
            {
                let mut inner = self.lock();
                inner.write_attempts += 1;
                if let Some(message) = inner.fail_next_update.take() {
                    return Err(StorageError::WriteRejected(message));
                }
                let doc = inner
                    .collections
                    .get_mut(&collection)
                    .and_then(|docs| docs.get_mut(&id))
                    .ok_or_else(|| StorageError::NotFound {
                        key: format!("{collection}/{id}"),
                    })?;
                doc.fields.extend(fields);
            }

            self.notify(Change::Written { collection });
            Ok(())
        })
    }
}
