use std::time::Duration;

use aws_sdk_s3::Client;
use bloom_core::doc_keys;
use bloom_core::ids::DocId;
use futures::StreamExt;
use jiff::Timestamp;
use serde_json::{Map, Value};

use crate::documents::{self, RawDocument};
use crate::error::StorageError;
use crate::objects;
use crate::store::{BoxFuture, ChangeStream, DocumentStore, Query};

/// Document store on an S3 bucket: one JSON object per document at
/// `<collection>/<id>.json`.
///
/// S3 has no push notifications, so [`DocumentStore::watch`] polls the query
/// every `poll_interval` and yields only when the result set changed.
#[derive(Clone)]
pub struct S3DocumentStore {
    client: Client,
    bucket: String,
    poll_interval: Duration,
}

impl S3DocumentStore {
    pub fn new(client: Client, bucket: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            poll_interval,
        }
    }

    async fn load(&self, query: &Query) -> Result<Vec<RawDocument>, StorageError> {
        let prefix = doc_keys::collection_prefix(&query.collection);
        let keys = objects::list_keys(&self.client, &self.bucket, &prefix).await?;

        let mut stored = Vec::new();
        for key in &keys {
            let Some(id) = doc_keys::id_from_key(&query.collection, key) else {
                continue;
            };
            match objects::get_json(&self.client, &self.bucket, key).await {
                Ok(object) => stored.push((id, object.value)),
                // deleted between list and get
                Err(StorageError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        // keys carry no owner, so every object is read before filtering
        Ok(documents::snapshot_from_stored(query, stored))
    }
}

impl DocumentStore for S3DocumentStore {
    fn list(&self, query: &Query) -> BoxFuture<'_, Result<Vec<RawDocument>, StorageError>> {
        let query = query.clone();
        Box::pin(async move { self.load(&query).await })
    }

    fn watch(&self, query: &Query) -> ChangeStream {
        let store = self.clone();
        let query = query.clone();

        async_stream::stream! {
            let mut ticker = tokio::time::interval(store.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last: Option<Vec<RawDocument>> = None;

            loop {
                ticker.tick().await;
                match store.load(&query).await {
                    Ok(docs) => {
                        if last.as_ref() != Some(&docs) {
                            last = Some(docs.clone());
                            yield Ok(docs);
                        }
                    }
                    Err(e) => yield Err(StorageError::StreamDisrupted(e.to_string())),
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
            let doc = RawDocument {
                id: DocId::generate(),
                created_at: Some(Timestamp::now()),
                fields,
            };
            let key = doc_keys::document(&collection, &doc.id);
            objects::put_json(&self.client, &self.bucket, &key, &doc.to_stored()).await?;

            tracing::info!(bucket = %self.bucket, key = %key, "document inserted");
            Ok(doc.id)
        })
    }

    fn update(
        &self,
        collection: &str,
        id: &DocId,
        fields: Map<String, Value>,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        let key = doc_keys::document(collection, id);
        Box::pin(async move {
            let current = objects::get_json(&self.client, &self.bucket, &key).await?;
            let Value::Object(mut stored) = current.value else {
                return Err(StorageError::NotAnObject(key));
            };
            stored.extend(fields);
            let merged = Value::Object(stored);

            match current.etag {
                Some(etag) => {
                    objects::put_json_if_match(&self.client, &self.bucket, &key, &merged, &etag)
                        .await?
                }
                None => objects::put_json(&self.client, &self.bucket, &key, &merged).await?,
            };

            tracing::info!(bucket = %self.bucket, key = %key, "document updated");
            Ok(())
        })
    }
}
