use bloom_core::ids::{DocId, OwnerId};
use bloom_core::models::Document;

use crate::error::SyncError;

/// The client-visible state of one collection for one owner.
///
/// Built from the latest authoritative snapshot plus entries written locally
/// that the stream has not echoed back yet. Pending entries come first, then
/// the snapshot newest-first.
#[derive(Debug, Clone)]
pub struct SyncedCollection<T> {
    owner: Option<OwnerId>,
    generation: u64,
    snapshot: Vec<T>,
    pending: Vec<T>,
    items: Vec<T>,
    using_fallback: bool,
    disruption: Option<SyncError>,
    loaded: bool,
}

impl<T: Document> SyncedCollection<T> {
    pub(crate) fn empty(owner: Option<OwnerId>, generation: u64) -> Self {
        Self {
            // without an owner there is nothing to wait for
            loaded: owner.is_none(),
            owner,
            generation,
            snapshot: Vec::new(),
            pending: Vec::new(),
            items: Vec::new(),
            using_fallback: false,
            disruption: None,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }

    /// Entries written locally and not yet confirmed by the stream.
    pub fn pending(&self) -> &[T] {
        &self.pending
    }

    /// True while [`items`](Self::items) holds placeholders, not real data.
    pub fn is_fallback(&self) -> bool {
        self.using_fallback
    }

    /// Set when the live subscription failed after the last good snapshot.
    pub fn disruption(&self) -> Option<&SyncError> {
        self.disruption.as_ref()
    }

    /// True once the first snapshot (or failure) has arrived.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn contains(&self, id: &DocId) -> bool {
        self.snapshot.iter().chain(&self.pending).any(|doc| doc.id() == id)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the snapshot and drop pending entries the store now reports.
    pub(crate) fn apply_snapshot(&mut self, mut docs: Vec<T>, fallback: Option<&[T]>) {
        sort_newest_first(&mut docs);
        self.pending
            .retain(|entry| !docs.iter().any(|doc| doc.id() == entry.id()));
        self.snapshot = docs;
        self.loaded = true;
        self.disruption = None;
        self.rebuild(fallback);
    }

    /// Record a stream failure without touching the data already shown.
    pub(crate) fn apply_disruption(&mut self, error: SyncError, fallback: Option<&[T]>) {
        self.disruption = Some(error);
        self.loaded = true;
        self.rebuild(fallback);
    }

    /// Show `entity` ahead of the snapshot until the stream confirms it.
    ///
    /// Refused when nobody is subscribed, when the entity belongs to another
    /// owner, or when an entry with the same id is already present.
    pub(crate) fn add_optimistic(&mut self, entity: T, fallback: Option<&[T]>) -> bool {
        if self.owner.as_ref() != Some(entity.owner_id()) || self.contains(entity.id()) {
            return false;
        }
        self.pending.insert(0, entity);
        self.rebuild(fallback);
        true
    }

    fn rebuild(&mut self, fallback: Option<&[T]>) {
        let mut items = self.pending.clone();
        items.extend(
            self.snapshot
                .iter()
                .filter(|doc| !self.pending.iter().any(|entry| entry.id() == doc.id()))
                .cloned(),
        );

        match fallback {
            Some(placeholders) if items.is_empty() && self.loaded && self.owner.is_some() => {
                self.items = placeholders.to_vec();
                self.using_fallback = true;
            }
            _ => {
                self.items = items;
                self.using_fallback = false;
            }
        }
    }
}

/// Most recent first; entries without a resolved timestamp count as oldest.
pub fn sort_newest_first<T: Document>(docs: &mut [T]) {
    docs.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}
