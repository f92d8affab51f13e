use serde_json::json;

use super::*;

fn make_element(id: &str, created_at: i64) -> BoardElement {
    BoardElement {
        id: id.into(),
        x: 0.0,
        y: 0.0,
        w: 240.0,
        h: 160.0,
        payload: TaskPayload { title: format!("task {id}"), ..Default::default() },
        created_at,
        updated_at: created_at,
    }
}

// =============================================================
// TaskPayload serde
// =============================================================

#[test]
fn payload_missing_fields_default() {
    let payload: TaskPayload = serde_json::from_value(json!({ "title": "Pitch deck" })).unwrap();
    assert_eq!(payload.title, "Pitch deck");
    assert!(payload.description.is_empty());
    assert!(payload.assignee.is_none());
    assert!(payload.mood_tags.is_empty());
}

#[test]
fn payload_keeps_all_task_fields() {
    let payload: TaskPayload = serde_json::from_value(json!({
        "title": "Moodboard review",
        "description": "collect references",
        "assignee": "ines",
        "mood_tags": ["calm", "bold"],
        "urgency": "high",
        "energy": "low",
        "due_date": "2026-11-02",
        "team_members": ["ines", "sam"],
    }))
    .unwrap();
    assert_eq!(payload.assignee.as_deref(), Some("ines"));
    assert_eq!(payload.mood_tags, vec!["calm", "bold"]);
    assert_eq!(payload.urgency.as_deref(), Some("high"));
    assert_eq!(payload.due_date.as_deref(), Some("2026-11-02"));
    assert_eq!(payload.team_members.len(), 2);
}

// =============================================================
// BoardElement
// =============================================================

#[test]
fn contains_is_edge_inclusive() {
    let mut el = make_element("a", 1);
    el.x = 10.0;
    el.y = 20.0;
    assert!(el.contains(Point::new(10.0, 20.0)));
    assert!(el.contains(Point::new(250.0, 180.0)));
    assert!(!el.contains(Point::new(250.1, 180.0)));
    assert!(!el.contains(Point::new(9.9, 50.0)));
}

// =============================================================
// ElementBounds
// =============================================================

#[test]
fn bounds_clamp_below_and_above() {
    let b = ElementBounds::default();
    assert_eq!(b.clamp_size(10.0, 10.0), (b.min_w, b.min_h));
    assert_eq!(b.clamp_size(9_000.0, 9_000.0), (b.max_w, b.max_h));
    assert_eq!(b.clamp_size(300.0, 200.0), (300.0, 200.0));
}

#[test]
fn bounds_nan_falls_back_to_min() {
    let b = ElementBounds::default();
    assert_eq!(b.clamp_size(f64::NAN, f64::NAN), (b.min_w, b.min_h));
}

#[test]
fn bounds_validity() {
    assert!(ElementBounds::default().is_valid());
    let inverted = ElementBounds { min_w: 300.0, max_w: 200.0, ..Default::default() };
    assert!(!inverted.is_valid());
    let zero = ElementBounds { min_h: 0.0, ..Default::default() };
    assert!(!zero.is_valid());
}

// =============================================================
// DocStore
// =============================================================

#[test]
fn store_insert_get_remove() {
    let mut store = DocStore::new();
    assert!(store.is_empty());
    store.insert(make_element("a", 1));
    assert_eq!(store.len(), 1);
    assert!(store.get("a").is_some());
    assert!(store.remove("a").is_some());
    assert!(store.remove("a").is_none());
    assert!(store.is_empty());
}

#[test]
fn store_set_position_and_size() {
    let mut store = DocStore::new();
    store.insert(make_element("a", 1));
    assert!(store.set_position("a", 5.0, 6.0));
    assert!(store.set_size("a", 300.0, 200.0));
    let el = store.get("a").unwrap();
    assert_eq!((el.x, el.y, el.w, el.h), (5.0, 6.0, 300.0, 200.0));
    assert!(!store.set_position("missing", 1.0, 1.0));
    assert!(!store.set_size("missing", 1.0, 1.0));
}

#[test]
fn store_load_snapshot_replaces_everything() {
    let mut store = DocStore::new();
    store.insert(make_element("old", 1));
    store.load_snapshot(vec![make_element("a", 2), make_element("b", 3)]);
    assert!(store.get("old").is_none());
    assert_eq!(store.len(), 2);
}

#[test]
fn sorted_elements_by_created_at_then_id() {
    let mut store = DocStore::new();
    store.insert(make_element("c", 5));
    store.insert(make_element("b", 1));
    store.insert(make_element("a", 5));
    store.insert(make_element("d", 3));
    let ids: Vec<&str> = store.sorted_elements().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "d", "a", "c"]);
}
