use bloom_core::ids::{DocId, OwnerId};
use bloom_core::models::Document;
use bloom_core::models::goal::{Goal, GoalEnd};
use bloom_core::models::recipe::Recipe;
use bloom_core::validation::Macros;
use bloom_storage::documents::{RawDocument, decode, decode_snapshot, encode, snapshot_from_stored};
use bloom_storage::store::Query;
use jiff::Timestamp;
use jiff::civil::date;
use serde_json::json;

fn stored_goal(id: &str, to: &str) -> RawDocument {
    RawDocument::from_stored(
        DocId::new(id),
        json!({
            "uid": "user-1",
            "calories": 370,
            "proteins": 30,
            "fats": 10,
            "carbs": 40,
            "from": "2025-01-01",
            "to": to,
            "createdAt": "2025-01-01T09:30:00Z",
        }),
    )
    .unwrap()
}

#[test]
fn stored_object_splits_out_metadata() {
    let raw = stored_goal("g1", "None");
    assert_eq!(
        raw.created_at,
        Some("2025-01-01T09:30:00Z".parse::<Timestamp>().unwrap())
    );
    assert!(!raw.fields.contains_key("createdAt"));
    assert_eq!(raw.owner(), Some("user-1"));
    assert_eq!(raw.to_stored()["createdAt"], "2025-01-01T09:30:00Z");
}

#[test]
fn unresolved_timestamp_stays_empty() {
    let raw = RawDocument::from_stored(DocId::new("r1"), json!({"uid": "u", "createdAt": null}))
        .unwrap();
    assert_eq!(raw.created_at, None);
}

#[test]
fn non_object_is_rejected() {
    assert!(RawDocument::from_stored(DocId::new("x"), json!([1, 2])).is_err());
}

#[test]
fn decode_carries_identity() {
    let goal: Goal = decode(stored_goal("g1", "None")).unwrap();
    assert_eq!(goal.id(), &DocId::new("g1"));
    assert!(goal.created_at().is_some());
    assert_eq!(goal.owner_id, OwnerId::new("user-1"));
    assert_eq!(goal.to, GoalEnd::Open);
}

#[test]
fn encode_omits_identity() {
    let goal = Goal::new_active(
        OwnerId::new("user-1"),
        Macros {
            calories: 370.0,
            proteins: 30.0,
            fats: 10.0,
            carbs: 40.0,
        },
        date(2025, 1, 1),
    );
    let fields = encode(&goal).unwrap();
    assert!(!fields.contains_key("id"));
    assert!(!fields.contains_key("createdAt"));
    assert_eq!(fields["uid"], "user-1");
}

#[test]
fn snapshot_decoding_skips_unreadable_documents() {
    let broken = stored_goal("g2", "whenever");
    let goals: Vec<Goal> = decode_snapshot(vec![stored_goal("g1", "None"), broken]);
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].id, DocId::new("g1"));

    let recipes: Vec<Recipe> = decode_snapshot(vec![RawDocument::from_stored(
        DocId::new("r1"),
        json!({"uid": "user-1", "name": "Soup"}),
    )
    .unwrap()]);
    assert_eq!(recipes[0].name, "Soup");
}

#[test]
fn recipe_with_blank_last_made_stays_in_snapshot() {
    let raw = RawDocument::from_stored(
        DocId::new("r1"),
        json!({"uid": "a", "name": "Soup", "steps": ["cook"], "lastMadeAt": ""}),
    )
    .unwrap();

    let recipes: Vec<Recipe> = decode_snapshot(vec![raw]);
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].last_made_at, None);
}

#[test]
fn stored_objects_that_are_not_documents_are_skipped() {
    let query = Query::owned_by("recipes", OwnerId::new("a"));
    let snapshot = snapshot_from_stored(
        &query,
        vec![
            (DocId::new("r1"), json!({"uid": "a", "name": "Soup"})),
            (DocId::new("r2"), json!(["not", "an", "object"])),
            (DocId::new("r3"), json!({"uid": "b", "name": "Stew"})),
            (DocId::new("r4"), json!({"uid": "a", "name": "Salad"})),
        ],
    );

    let ids: Vec<_> = snapshot.iter().map(|doc| doc.id.as_str()).collect();
    assert_eq!(ids, ["r1", "r4"]);
}
