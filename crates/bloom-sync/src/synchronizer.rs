use std::sync::{Arc, Mutex, PoisonError};

use bloom_core::ids::OwnerId;
use bloom_core::models::Document;
use bloom_storage::documents::decode_snapshot;
use bloom_storage::store::{ChangeStream, DocumentStore, Query};
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::SyncError;
use crate::view::SyncedCollection;

/// Owns the merged view of one collection.
///
/// The view is only ever mutated here: by the background task following the
/// store's change stream, and by [`add_optimistic`](Self::add_optimistic).
/// Readers get a `watch::Receiver` and see every new state.
///
/// Each subscription bumps a generation counter. A stream task only applies
/// events while its generation is current, so nothing from a previous owner
/// lands in the view after a switch or a teardown.
pub struct CollectionSynchronizer<T: Document> {
    store: Arc<dyn DocumentStore>,
    fallback: Option<Arc<[T]>>,
    view: Arc<watch::Sender<SyncedCollection<T>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Document> CollectionSynchronizer<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (view, _) = watch::channel(SyncedCollection::empty(None, 0));
        Self {
            store,
            fallback: None,
            view: Arc::new(view),
            task: Mutex::new(None),
        }
    }

    /// Show `placeholders` whenever the owner's real collection is empty.
    pub fn with_fallback(mut self, placeholders: Vec<T>) -> Self {
        self.fallback = Some(Arc::from(placeholders));
        self
    }

    /// Follow `owner`'s documents, replacing any previous subscription.
    ///
    /// With no owner the view is emptied and no stream is opened. Must be
    /// called from within a Tokio runtime.
    pub fn subscribe(&self, owner: Option<OwnerId>) -> watch::Receiver<SyncedCollection<T>> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let generation = self.reset(owner.clone());

        match owner {
            Some(owner) => {
                tracing::debug!(collection = T::COLLECTION, owner = %owner, generation, "opening change stream");
                let stream = self.store.watch(&Query::owned_by(T::COLLECTION, owner));
                *task = Some(tokio::spawn(follow_stream(
                    stream,
                    Arc::clone(&self.view),
                    self.fallback.clone(),
                    generation,
                )));
            }
            None => {
                tracing::debug!(collection = T::COLLECTION, "no owner, collection left empty");
            }
        }

        self.view.subscribe()
    }

    /// Close the current subscription and empty the view.
    pub fn teardown(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = task.take() {
            previous.abort();
        }
        self.reset(None);
        tracing::debug!(collection = T::COLLECTION, "subscription torn down");
    }

    /// A receiver for the current view without touching the subscription.
    pub fn view(&self) -> watch::Receiver<SyncedCollection<T>> {
        self.view.subscribe()
    }

    /// A copy of the view as it is right now.
    pub fn current(&self) -> SyncedCollection<T> {
        self.view.borrow().clone()
    }

    /// Show a locally written entity immediately, ahead of server
    /// confirmation. Returns `false` if it was refused (see
    /// [`SyncedCollection`] for when that happens).
    pub fn add_optimistic(&self, entity: T) -> bool {
        let fallback = self.fallback.as_deref();
        let added = self
            .view
            .send_if_modified(|state| state.add_optimistic(entity, fallback));
        if !added {
            tracing::debug!(collection = T::COLLECTION, "optimistic entry refused");
        }
        added
    }

    fn reset(&self, owner: Option<OwnerId>) -> u64 {
        let mut generation = 0;
        self.view.send_modify(|state| {
            generation = state.generation() + 1;
            *state = SyncedCollection::empty(owner, generation);
        });
        generation
    }
}

impl<T: Document> Drop for CollectionSynchronizer<T> {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

async fn follow_stream<T: Document>(
    mut stream: ChangeStream,
    view: Arc<watch::Sender<SyncedCollection<T>>>,
    fallback: Option<Arc<[T]>>,
    generation: u64,
) {
    while let Some(event) = stream.next().await {
        let current = match event {
            Ok(raw) => {
                let docs = decode_snapshot::<T>(raw);
                let count = docs.len();
                let current = view.send_if_modified(|state| {
                    if state.generation() != generation {
                        return false;
                    }
                    state.apply_snapshot(docs, fallback.as_deref());
                    true
                });
                if current {
                    tracing::debug!(collection = T::COLLECTION, count, "snapshot applied");
                }
                current
            }
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, error = %e, "change stream disrupted, keeping last snapshot");
                view.send_if_modified(|state| {
                    if state.generation() != generation {
                        return false;
                    }
                    state.apply_disruption(SyncError::StreamDisrupted(e.to_string()), fallback.as_deref());
                    true
                })
            }
        };

        if !current {
            break;
        }
    }

    tracing::debug!(collection = T::COLLECTION, generation, "change stream closed");
}
