use std::future::Future;
use std::pin::Pin;

use bloom_core::ids::{DocId, OwnerId};
use futures::stream::BoxStream;
use serde_json::{Map, Value};

use crate::documents::RawDocument;
use crate::error::StorageError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Live feed of full snapshots for one query.
///
/// The first item is the current snapshot; every later item is the complete
/// result set after a change. Errors are recoverable: the stream keeps going
/// after yielding one. Dropping the stream unsubscribes.
pub type ChangeStream = BoxStream<'static, Result<Vec<RawDocument>, StorageError>>;

/// Documents of one collection belonging to one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: String,
    pub owner: OwnerId,
}

impl Query {
    pub fn owned_by(collection: impl Into<String>, owner: OwnerId) -> Self {
        Self {
            collection: collection.into(),
            owner,
        }
    }

    pub fn matches(&self, doc: &RawDocument) -> bool {
        doc.owner() == Some(self.owner.as_str())
    }
}

/// The document store the client reads and writes through.
///
/// Methods return boxed futures for dyn compatibility.
pub trait DocumentStore: Send + Sync {
    /// One-shot scoped query.
    fn list(&self, query: &Query) -> BoxFuture<'_, Result<Vec<RawDocument>, StorageError>>;

    /// Subscribe to the query's result set.
    fn watch(&self, query: &Query) -> ChangeStream;

    /// Insert a new document. The store assigns the id and the creation
    /// timestamp.
    fn insert(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'_, Result<DocId, StorageError>>;

    /// Merge `fields` into an existing document.
    fn update(
        &self,
        collection: &str,
        id: &DocId,
        fields: Map<String, Value>,
    ) -> BoxFuture<'_, Result<(), StorageError>>;
}
