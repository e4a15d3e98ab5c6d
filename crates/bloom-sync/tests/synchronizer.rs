use std::sync::{Arc, Mutex};
use std::time::Duration;

use bloom_core::doc_keys;
use bloom_core::ids::{DocId, OwnerId};
use bloom_core::models::Document;
use bloom_core::models::goal::Goal;
use bloom_core::models::recipe::{Recipe, placeholder_recipes};
use bloom_core::validation::Macros;
use bloom_storage::documents::{RawDocument, encode};
use bloom_storage::error::StorageError;
use bloom_storage::memory::MemoryStore;
use bloom_storage::store::{BoxFuture, ChangeStream, DocumentStore, Query};
use bloom_sync::synchronizer::CollectionSynchronizer;
use bloom_sync::view::SyncedCollection;
use futures::StreamExt;
use jiff::Timestamp;
use jiff::civil::date;
use serde_json::{Map, Value, json};
use tokio::sync::watch;

const WAIT: Duration = Duration::from_secs(2);

async fn settle<T: Document>(
    rx: &mut watch::Receiver<SyncedCollection<T>>,
    pred: impl FnMut(&SyncedCollection<T>) -> bool,
) -> SyncedCollection<T> {
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("view never reached the expected state")
        .expect("synchronizer dropped")
        .clone()
}

fn owner(name: &str) -> OwnerId {
    OwnerId::new(name)
}

fn goal_doc(id: &str, owner: &str, created_at: Option<i64>) -> RawDocument {
    let mut goal = Goal::new_active(
        OwnerId::new(owner),
        Macros {
            calories: 370.0,
            proteins: 30.0,
            fats: 10.0,
            carbs: 40.0,
        },
        date(2025, 1, 1),
    );
    goal.id = DocId::new(id);
    RawDocument {
        id: DocId::new(id),
        created_at: created_at.map(|s| Timestamp::from_second(s).unwrap()),
        fields: encode(&goal).unwrap(),
    }
}

fn recipe_fields(owner: &str, name: &str) -> Map<String, Value> {
    match json!({"uid": owner, "name": name, "steps": ["cook"]}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn ids<T: Document>(view: &SyncedCollection<T>) -> Vec<String> {
    view.items().iter().map(|item| item.id().to_string()).collect()
}

fn goals_sync(store: &MemoryStore) -> CollectionSynchronizer<Goal> {
    CollectionSynchronizer::new(Arc::new(store.clone()))
}

fn recipes_sync(store: &MemoryStore) -> CollectionSynchronizer<Recipe> {
    CollectionSynchronizer::new(Arc::new(store.clone())).with_fallback(placeholder_recipes())
}

#[tokio::test]
async fn no_owner_means_empty_view_and_no_fallback() {
    let store = MemoryStore::new();
    let sync = recipes_sync(&store);
    let view = sync.subscribe(None).borrow().clone();

    assert!(view.is_empty());
    assert!(!view.is_fallback());
    assert!(view.is_loaded());
    assert!(view.owner().is_none());
}

#[tokio::test]
async fn snapshot_is_ordered_newest_first_with_unresolved_last() {
    let store = MemoryStore::new();
    store.seed(doc_keys::GOALS, goal_doc("old", "a", Some(1_000)));
    store.seed(doc_keys::GOALS, goal_doc("pending-ts", "a", None));
    store.seed(doc_keys::GOALS, goal_doc("new", "a", Some(3_000)));
    store.seed(doc_keys::GOALS, goal_doc("mid", "a", Some(2_000)));
    store.seed(doc_keys::GOALS, goal_doc("someone-else", "b", Some(4_000)));

    let sync = goals_sync(&store);
    let mut rx = sync.subscribe(Some(owner("a")));
    let view = settle(&mut rx, |v| v.is_loaded()).await;

    assert_eq!(ids(&view), ["new", "mid", "old", "pending-ts"]);
    assert!(!view.is_fallback());
}

#[tokio::test]
async fn optimistic_entry_leads_until_echoed() {
    let store = MemoryStore::new();
    store.seed(doc_keys::GOALS, goal_doc("existing", "a", Some(1_000)));
    let sync = goals_sync(&store);
    let mut rx = sync.subscribe(Some(owner("a")));
    settle(&mut rx, |v| v.len() == 1).await;

    let mut fresh: Goal = bloom_storage::documents::decode(goal_doc("fresh", "a", None)).unwrap();
    fresh.created_at = None;
    assert!(sync.add_optimistic(fresh.clone()));
    assert!(!sync.add_optimistic(fresh));

    let view = sync.current();
    assert_eq!(ids(&view), ["fresh", "existing"]);
    assert_eq!(view.pending().len(), 1);

    store.seed(doc_keys::GOALS, goal_doc("fresh", "a", Some(2_000)));
    let view = settle(&mut rx, |v| v.pending().is_empty()).await;
    assert_eq!(ids(&view), ["fresh", "existing"]);
    assert!(view.items()[0].created_at.is_some());
}

#[tokio::test]
async fn optimistic_entry_for_another_owner_is_refused() {
    let store = MemoryStore::new();
    let sync = goals_sync(&store);
    let mut rx = sync.subscribe(Some(owner("a")));
    settle(&mut rx, |v| v.is_loaded()).await;

    let stranger: Goal = bloom_storage::documents::decode(goal_doc("x", "b", None)).unwrap();
    assert!(!sync.add_optimistic(stranger));
    assert!(sync.current().is_empty());
}

#[tokio::test]
async fn empty_recipe_snapshot_shows_placeholders() {
    let store = MemoryStore::new();
    let sync = recipes_sync(&store);
    let mut rx = sync.subscribe(Some(owner("a")));

    let view = settle(&mut rx, |v| v.is_loaded()).await;
    assert!(view.is_fallback());
    assert_eq!(view.len(), placeholder_recipes().len());

    store
        .insert(doc_keys::RECIPES, recipe_fields("a", "Real soup"))
        .await
        .unwrap();
    let view = settle(&mut rx, |v| !v.is_fallback()).await;
    assert_eq!(view.len(), 1);
    assert_eq!(view.items()[0].name, "Real soup");
}

#[tokio::test]
async fn optimistic_recipe_replaces_placeholders() {
    let store = MemoryStore::new();
    let sync = recipes_sync(&store);
    let mut rx = sync.subscribe(Some(owner("a")));
    settle(&mut rx, |v| v.is_fallback()).await;

    let mut recipe = placeholder_recipes().remove(0);
    recipe.id = DocId::new("r1");
    recipe.owner_id = owner("a");
    assert!(sync.add_optimistic(recipe));

    let view = sync.current();
    assert!(!view.is_fallback());
    assert_eq!(ids(&view), ["r1"]);
}

#[tokio::test]
async fn disruption_keeps_last_snapshot() {
    let store = MemoryStore::new();
    store.seed(doc_keys::GOALS, goal_doc("g1", "a", Some(1_000)));
    let sync = goals_sync(&store);
    let mut rx = sync.subscribe(Some(owner("a")));
    settle(&mut rx, |v| v.len() == 1).await;

    store.disrupt_stream(doc_keys::GOALS, "network down");
    let view = settle(&mut rx, |v| v.disruption().is_some()).await;
    assert_eq!(ids(&view), ["g1"]);
    assert_eq!(
        view.disruption().unwrap().to_string(),
        "live updates interrupted: change stream disrupted: network down"
    );

    store.seed(doc_keys::GOALS, goal_doc("g2", "a", Some(2_000)));
    let view = settle(&mut rx, |v| v.disruption().is_none()).await;
    assert_eq!(ids(&view), ["g2", "g1"]);
}

#[tokio::test]
async fn switching_owner_drops_previous_subscription() {
    let store = MemoryStore::new();
    store.seed(doc_keys::GOALS, goal_doc("a1", "a", Some(1_000)));
    let sync = goals_sync(&store);
    let mut rx = sync.subscribe(Some(owner("a")));
    settle(&mut rx, |v| v.len() == 1).await;

    let mut rx = sync.subscribe(Some(owner("b")));
    assert!(rx.borrow().is_empty());
    assert_eq!(rx.borrow().owner(), Some(&owner("b")));

    store.seed(doc_keys::GOALS, goal_doc("a2", "a", Some(2_000)));
    store.seed(doc_keys::GOALS, goal_doc("b1", "b", Some(3_000)));
    let view = settle(&mut rx, |v| !v.is_empty()).await;
    assert_eq!(ids(&view), ["b1"]);
}

#[tokio::test]
async fn teardown_empties_and_ignores_later_events() {
    let store = MemoryStore::new();
    store.seed(doc_keys::GOALS, goal_doc("a1", "a", Some(1_000)));
    let sync = goals_sync(&store);
    let mut rx = sync.subscribe(Some(owner("a")));
    settle(&mut rx, |v| v.len() == 1).await;

    sync.teardown();
    assert!(sync.current().is_empty());

    store.seed(doc_keys::GOALS, goal_doc("a2", "a", Some(2_000)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sync.current().is_empty());
    assert!(sync.current().owner().is_none());
}

/// A store whose stream replays a fixed script, then stays open.
struct ScriptedStore {
    script: Mutex<Vec<Result<Vec<RawDocument>, StorageError>>>,
}

impl DocumentStore for ScriptedStore {
    fn list(&self, _query: &Query) -> BoxFuture<'_, Result<Vec<RawDocument>, StorageError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn watch(&self, _query: &Query) -> ChangeStream {
        let events = std::mem::take(&mut *self.script.lock().unwrap());
        futures::stream::iter(events)
            .chain(futures::stream::pending())
            .boxed()
    }

    fn insert(
        &self,
        _collection: &str,
        _fields: Map<String, Value>,
    ) -> BoxFuture<'_, Result<DocId, StorageError>> {
        Box::pin(async { Err(StorageError::WriteRejected("read only".into())) })
    }

    fn update(
        &self,
        _collection: &str,
        _id: &DocId,
        _fields: Map<String, Value>,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async { Err(StorageError::WriteRejected("read only".into())) })
    }
}

#[tokio::test]
async fn failure_before_first_snapshot_shows_placeholders_with_flag() {
    let store = ScriptedStore {
        script: Mutex::new(vec![Err(StorageError::StreamDisrupted("unreachable".into()))]),
    };
    let sync: CollectionSynchronizer<Recipe> =
        CollectionSynchronizer::new(Arc::new(store)).with_fallback(placeholder_recipes());
    let mut rx = sync.subscribe(Some(owner("a")));

    let view = settle(&mut rx, |v| v.is_loaded()).await;
    assert!(view.is_fallback());
    assert!(view.disruption().is_some());
    assert_eq!(view.len(), 3);
}

#[tokio::test]
async fn failure_before_first_snapshot_without_fallback_is_empty() {
    let store = ScriptedStore {
        script: Mutex::new(vec![Err(StorageError::StreamDisrupted("unreachable".into()))]),
    };
    let sync: CollectionSynchronizer<Goal> = CollectionSynchronizer::new(Arc::new(store));
    let mut rx = sync.subscribe(Some(owner("a")));

    let view = settle(&mut rx, |v| v.is_loaded()).await;
    assert!(view.is_empty());
    assert!(!view.is_fallback());
    assert!(view.disruption().is_some());
}
