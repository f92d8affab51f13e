use super::*;
use crate::doc::TaskPayload;

fn element(id: &str, x: f64, y: f64, created_at: i64) -> BoardElement {
    BoardElement {
        id: id.into(),
        x,
        y,
        w: 200.0,
        h: 150.0,
        payload: TaskPayload::default(),
        created_at,
        updated_at: created_at,
    }
}

fn doc_with(elements: Vec<BoardElement>) -> DocStore {
    let mut doc = DocStore::new();
    doc.load_snapshot(elements);
    doc
}

#[test]
fn empty_board_hits_nothing() {
    let doc = DocStore::new();
    assert!(hit_test(Point::new(10.0, 10.0), &doc, &Camera::default()).is_none());
}

#[test]
fn body_hit() {
    let doc = doc_with(vec![element("a", 0.0, 0.0, 1)]);
    let hit = hit_test(Point::new(50.0, 50.0), &doc, &Camera::default()).unwrap();
    assert_eq!(hit, Hit { element_id: "a".into(), part: HitPart::Body });
}

#[test]
fn miss_outside_element() {
    let doc = doc_with(vec![element("a", 0.0, 0.0, 1)]);
    assert!(hit_test(Point::new(201.0, 50.0), &doc, &Camera::default()).is_none());
}

#[test]
fn resize_handle_at_bottom_right() {
    let doc = doc_with(vec![element("a", 0.0, 0.0, 1)]);
    let hit = hit_test(Point::new(195.0, 145.0), &doc, &Camera::default()).unwrap();
    assert_eq!(hit.part, HitPart::ResizeHandle);
}

#[test]
fn remove_control_at_top_right() {
    let doc = doc_with(vec![element("a", 0.0, 0.0, 1)]);
    let hit = hit_test(Point::new(195.0, 5.0), &doc, &Camera::default()).unwrap();
    assert_eq!(hit.part, HitPart::Control(Control::Remove));
}

#[test]
fn handle_grows_in_world_units_when_zoomed_out() {
    let doc = doc_with(vec![element("a", 0.0, 0.0, 1)]);
    let point = Point::new(200.0 - 20.0, 150.0 - 20.0);
    assert_eq!(hit_test(point, &doc, &Camera::default()).unwrap().part, HitPart::Body);
    let zoomed_out = Camera::new(Point::default(), 0.5);
    assert_eq!(hit_test(point, &doc, &zoomed_out).unwrap().part, HitPart::ResizeHandle);
}

#[test]
fn topmost_element_wins_on_overlap() {
    let doc = doc_with(vec![element("under", 0.0, 0.0, 1), element("over", 50.0, 50.0, 2)]);
    let hit = hit_test(Point::new(100.0, 100.0), &doc, &Camera::default()).unwrap();
    assert_eq!(hit.element_id, "over");
}

#[test]
fn same_created_at_tie_broken_by_id() {
    let doc = doc_with(vec![element("b", 0.0, 0.0, 7), element("a", 0.0, 0.0, 7)]);
    let hit = hit_test(Point::new(100.0, 100.0), &doc, &Camera::default()).unwrap();
    assert_eq!(hit.element_id, "b");
}
