use bloom_core::doc_keys::{CREATED_AT_FIELD, OWNER_FIELD};
use bloom_core::ids::DocId;
use bloom_core::models::Document;
use jiff::Timestamp;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::store::Query;

/// A document as the store hands it out: body plus store-assigned metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: DocId,
    pub created_at: Option<Timestamp>,
    pub fields: Map<String, Value>,
}

impl RawDocument {
    pub fn owner(&self) -> Option<&str> {
        self.fields.get(OWNER_FIELD).and_then(Value::as_str)
    }

    /// Split a stored JSON object into body and metadata.
    ///
    /// A missing or unparseable `createdAt` leaves the timestamp unresolved.
    pub fn from_stored(id: DocId, value: Value) -> Result<Self, StorageError> {
        let Value::Object(mut fields) = value else {
            return Err(StorageError::NotAnObject(id.to_string()));
        };
        let created_at = fields
            .remove(CREATED_AT_FIELD)
            .and_then(|v| v.as_str().and_then(|s| s.parse::<Timestamp>().ok()));
        fields.remove("id");
        Ok(Self {
            id,
            created_at,
            fields,
        })
    }

    /// The JSON object persisted for this document.
    pub fn to_stored(&self) -> Value {
        let mut fields = self.fields.clone();
        if let Some(ts) = self.created_at {
            fields.insert(CREATED_AT_FIELD.to_string(), Value::String(ts.to_string()));
        }
        Value::Object(fields)
    }
}

/// Serialize an entity body for writing.
pub fn encode<T: Serialize>(value: &T) -> Result<Map<String, Value>, StorageError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StorageError::NotAnObject(other.to_string())),
    }
}

/// Deserialize a raw document into an entity, carrying over id and timestamp.
pub fn decode<T: Document>(raw: RawDocument) -> Result<T, StorageError> {
    let RawDocument {
        id,
        created_at,
        fields,
    } = raw;
    let mut entity: T =
        serde_json::from_value(Value::Object(fields)).map_err(|e| StorageError::Decode {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
    entity.assign_identity(id, created_at);
    Ok(entity)
}

/// Decode a whole snapshot. Documents that cannot be read are skipped.
pub fn decode_snapshot<T: Document>(raw: Vec<RawDocument>) -> Vec<T> {
    raw.into_iter()
        .filter_map(|doc| match decode::<T>(doc) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, error = %e, "skipping unreadable document");
                None
            }
        })
        .collect()
}

/// Build `query`'s snapshot from stored objects.
///
/// Objects that are not JSON objects are skipped with a warning, the rest are
/// kept when they belong to the queried owner.
pub fn snapshot_from_stored(query: &Query, objects: Vec<(DocId, Value)>) -> Vec<RawDocument> {
    objects
        .into_iter()
        .filter_map(|(id, value)| match RawDocument::from_stored(id, value) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(collection = %query.collection, error = %e, "skipping unreadable object");
                None
            }
        })
        .filter(|doc| query.matches(doc))
        .collect()
}
