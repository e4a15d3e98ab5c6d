pub mod goal;
pub mod recipe;

use jiff::Timestamp;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ids::{DocId, OwnerId};

/// An owner-scoped entity stored as one document in a named collection.
///
/// The id and creation timestamp are assigned by the store and travel beside
/// the document body, not inside it.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the entity lives in (see [`crate::doc_keys`]).
    const COLLECTION: &'static str;

    fn id(&self) -> &DocId;

    fn owner_id(&self) -> &OwnerId;

    /// Server-assigned creation time; `None` until the store resolves it.
    fn created_at(&self) -> Option<Timestamp>;

    fn assign_identity(&mut self, id: DocId, created_at: Option<Timestamp>);
}
