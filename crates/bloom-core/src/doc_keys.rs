//! Collection names and object key conventions.
//!
//! Pure string functions. These define where documents of each collection
//! live in an object-backed store.

use crate::ids::DocId;

pub const GOALS: &str = "goals";
pub const RECIPES: &str = "recipes";

/// Field every owner-scoped document carries.
pub const OWNER_FIELD: &str = "uid";

/// Server-assigned creation timestamp field.
pub const CREATED_AT_FIELD: &str = "createdAt";

pub fn collection_prefix(collection: &str) -> String {
    format!("{collection}/")
}

pub fn document(collection: &str, id: &DocId) -> String {
    format!("{collection}/{id}.json")
}

/// Recover the document id from an object key produced by [`document`].
pub fn id_from_key(collection: &str, key: &str) -> Option<DocId> {
    key.strip_prefix(&collection_prefix(collection))
        .and_then(|rest| rest.strip_suffix(".json"))
        .filter(|id| !id.is_empty() && !id.contains('/'))
        .map(DocId::new)
}
