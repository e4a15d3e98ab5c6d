use std::time::Duration;

use bloom_core::doc_keys;
use bloom_core::ids::{DocId, OwnerId};
use bloom_storage::documents::RawDocument;
use bloom_storage::error::StorageError;
use bloom_storage::memory::MemoryStore;
use bloom_storage::store::{ChangeStream, DocumentStore, Query};
use futures::StreamExt;
use serde_json::{Map, Value, json};

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

async fn next(stream: &mut ChangeStream) -> Result<Vec<RawDocument>, StorageError> {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("stream went quiet")
        .expect("stream ended")
}

#[tokio::test]
async fn insert_assigns_id_and_increasing_timestamps() {
    let store = MemoryStore::new();
    let first = store
        .insert(doc_keys::GOALS, fields(json!({"uid": "a"})))
        .await
        .unwrap();
    let second = store
        .insert(doc_keys::GOALS, fields(json!({"uid": "a"})))
        .await
        .unwrap();

    assert_ne!(first, second);
    let t1 = store.get(doc_keys::GOALS, &first).unwrap().created_at.unwrap();
    let t2 = store.get(doc_keys::GOALS, &second).unwrap().created_at.unwrap();
    assert!(t2 > t1);
    assert_eq!(store.write_attempts(), 2);
}

#[tokio::test]
async fn queries_are_scoped_to_owner() {
    let store = MemoryStore::new();
    store
        .insert(doc_keys::RECIPES, fields(json!({"uid": "a", "name": "mine"})))
        .await
        .unwrap();
    store
        .insert(doc_keys::RECIPES, fields(json!({"uid": "b", "name": "theirs"})))
        .await
        .unwrap();

    let docs = store
        .list(&Query::owned_by(doc_keys::RECIPES, OwnerId::new("a")))
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].fields["name"], "mine");
}

#[tokio::test]
async fn watch_yields_initial_snapshot_then_changes() {
    let store = MemoryStore::new();
    let query = Query::owned_by(doc_keys::GOALS, OwnerId::new("a"));
    let mut stream = store.watch(&query);

    assert!(next(&mut stream).await.unwrap().is_empty());

    let id = store
        .insert(doc_keys::GOALS, fields(json!({"uid": "a", "to": "None"})))
        .await
        .unwrap();
    let snapshot = next(&mut stream).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);

    store
        .update(doc_keys::GOALS, &id, fields(json!({"to": "2025-01-02"})))
        .await
        .unwrap();
    let snapshot = next(&mut stream).await.unwrap();
    assert_eq!(snapshot[0].fields["to"], "2025-01-02");
    assert_eq!(snapshot[0].fields["uid"], "a");
}

#[tokio::test]
async fn writes_to_other_collections_do_not_wake_watchers() {
    let store = MemoryStore::new();
    let mut stream = store.watch(&Query::owned_by(doc_keys::GOALS, OwnerId::new("a")));
    next(&mut stream).await.unwrap();

    store
        .insert(doc_keys::RECIPES, fields(json!({"uid": "a"})))
        .await
        .unwrap();
    store.disrupt_stream(doc_keys::GOALS, "offline");

    match next(&mut stream).await {
        Err(StorageError::StreamDisrupted(message)) => assert_eq!(message, "offline"),
        other => panic!("expected the disruption first, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_keeps_going_after_disruption() {
    let store = MemoryStore::new();
    let mut stream = store.watch(&Query::owned_by(doc_keys::GOALS, OwnerId::new("a")));
    next(&mut stream).await.unwrap();

    store.disrupt_stream(doc_keys::GOALS, "offline");
    assert!(next(&mut stream).await.is_err());

    store
        .insert(doc_keys::GOALS, fields(json!({"uid": "a"})))
        .await
        .unwrap();
    assert_eq!(next(&mut stream).await.unwrap().len(), 1);
}

#[tokio::test]
async fn injected_failures_reject_one_write() {
    let store = MemoryStore::new();
    store.fail_next_insert("quota exceeded");

    let err = store
        .insert(doc_keys::GOALS, fields(json!({"uid": "a"})))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "write rejected: quota exceeded");
    assert!(store.all(doc_keys::GOALS).is_empty());

    let id = store
        .insert(doc_keys::GOALS, fields(json!({"uid": "a"})))
        .await
        .unwrap();

    store.fail_next_update("permission denied");
    assert!(store.update(doc_keys::GOALS, &id, Map::new()).await.is_err());
    assert!(store.update(doc_keys::GOALS, &id, Map::new()).await.is_ok());
    assert_eq!(store.write_attempts(), 4);
}

#[tokio::test]
async fn updating_a_missing_document_fails() {
    let store = MemoryStore::new();
    let err = store
        .update(doc_keys::GOALS, &DocId::new("nope"), Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}
