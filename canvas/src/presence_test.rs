#![allow(clippy::float_cmp)]

use super::*;

fn presence(x: f64, y: f64, name: &str) -> CursorPresence {
    CursorPresence { x, y, tag: format!("@{name}"), name: name.into(), color: cursor_color(name).into(), updated_at: 0 }
}

fn peers(list: &[(&str, f64, f64)]) -> Vec<(String, CursorPresence)> {
    list.iter()
        .map(|(id, x, y)| ((*id).to_string(), presence(*x, *y, id)))
        .collect()
}

// =============================================================
// cursor_color
// =============================================================

#[test]
fn color_is_stable_per_identity() {
    assert_eq!(cursor_color("viewer-a"), cursor_color("viewer-a"));
    assert!(CURSOR_PALETTE.contains(&cursor_color("viewer-a")));
}

#[test]
fn color_known_fnv_values() {
    // FNV-1a("") = 0x811c9dc5 = 2166136261; % 10 = 1
    assert_eq!(cursor_color(""), CURSOR_PALETTE[1]);
    // FNV-1a("a") = 0xe40c292c = 3826002220; % 10 = 0
    assert_eq!(cursor_color("a"), CURSOR_PALETTE[0]);
}

#[test]
fn color_spreads_across_palette() {
    let used: std::collections::HashSet<&str> = (0..200).map(|i| cursor_color(&format!("user-{i}"))).collect();
    assert!(used.len() > 5);
}

// =============================================================
// PointerTracker
// =============================================================

#[test]
fn idle_tracker_sends_nothing() {
    let t = PointerTracker::new();
    assert!(!t.is_active());
    assert_eq!(t.poll(1_000, 3_000), None);
}

#[test]
fn move_marks_dirty_and_sends_once() {
    let mut t = PointerTracker::new();
    t.pointer_at(Point::new(10.0, 20.0));
    assert_eq!(t.poll(0, 3_000), Some(Point::new(10.0, 20.0)));
    t.mark_sent(0);
    assert_eq!(t.poll(180, 3_000), None);
}

#[test]
fn many_moves_between_ticks_send_latest_only() {
    let mut t = PointerTracker::new();
    for i in 0..50 {
        t.pointer_at(Point::new(f64::from(i), 0.0));
    }
    assert_eq!(t.poll(0, 3_000), Some(Point::new(49.0, 0.0)));
}

#[test]
fn keepalive_republishes_still_pointer() {
    let mut t = PointerTracker::new();
    t.pointer_at(Point::new(1.0, 1.0));
    t.mark_sent(1_000);
    assert_eq!(t.poll(3_999, 3_000), None);
    assert_eq!(t.poll(4_000, 3_000), Some(Point::new(1.0, 1.0)));
}

#[test]
fn leave_stops_sending_and_reports_activity() {
    let mut t = PointerTracker::new();
    assert!(!t.leave());
    t.pointer_at(Point::new(1.0, 1.0));
    assert!(t.leave());
    assert_eq!(t.poll(10_000, 3_000), None);
}

#[test]
fn reentering_sends_immediately() {
    let mut t = PointerTracker::new();
    t.pointer_at(Point::new(1.0, 1.0));
    t.mark_sent(0);
    t.leave();
    t.pointer_at(Point::new(5.0, 5.0));
    assert_eq!(t.poll(10, 3_000), Some(Point::new(5.0, 5.0)));
}

// =============================================================
// RemoteCursors
// =============================================================

#[test]
fn new_peer_starts_at_received_position() {
    let mut rc = RemoteCursors::default();
    rc.apply_snapshot(peers(&[("b", 100.0, 50.0)]), "a");
    let c = rc.get("b").unwrap();
    assert_eq!(c.world, Point::new(100.0, 50.0));
    assert_eq!(c.target, Point::new(100.0, 50.0));
    assert_eq!(c.name, "b");
}

#[test]
fn self_is_never_rendered() {
    let mut rc = RemoteCursors::default();
    rc.apply_snapshot(peers(&[("a", 0.0, 0.0), ("b", 1.0, 1.0)]), "a");
    assert!(rc.get("a").is_none());
    assert_eq!(rc.len(), 1);
}

#[test]
fn update_moves_target_not_rendered_position() {
    let mut rc = RemoteCursors::default();
    rc.apply_snapshot(peers(&[("b", 0.0, 0.0)]), "a");
    rc.apply_snapshot(peers(&[("b", 160.0, 0.0)]), "a");
    let c = rc.get("b").unwrap();
    assert_eq!(c.world, Point::new(0.0, 0.0));
    assert_eq!(c.target, Point::new(160.0, 0.0));
}

#[test]
fn converges_exactly_after_window() {
    let mut rc = RemoteCursors::new(160.0, 0.5);
    rc.apply_snapshot(peers(&[("b", 0.0, 0.0)]), "a");
    rc.apply_snapshot(peers(&[("b", 300.0, -120.0)]), "a");
    let mut last_distance = f64::INFINITY;
    for _ in 0..10 {
        rc.advance(16.0);
        let c = rc.get("b").unwrap();
        let d = c.world.distance(c.target);
        assert!(d <= last_distance, "moved away from target");
        assert!(c.world.x <= 300.0 && c.world.y >= -120.0, "overshot: {:?}", c.world);
        last_distance = d;
    }
    assert_eq!(rc.get("b").unwrap().world, Point::new(300.0, -120.0));
}

#[test]
fn one_long_frame_lands_on_target() {
    let mut rc = RemoteCursors::new(160.0, 0.5);
    rc.apply_snapshot(peers(&[("b", 0.0, 0.0)]), "a");
    rc.apply_snapshot(peers(&[("b", 50.0, 50.0)]), "a");
    rc.advance(1_000.0);
    assert_eq!(rc.get("b").unwrap().world, Point::new(50.0, 50.0));
}

#[test]
fn partial_progress_is_proportional_to_elapsed_time() {
    let mut rc = RemoteCursors::new(160.0, 0.0);
    rc.apply_snapshot(peers(&[("b", 0.0, 0.0)]), "a");
    rc.apply_snapshot(peers(&[("b", 160.0, 0.0)]), "a");
    rc.advance(40.0);
    assert!((rc.get("b").unwrap().world.x - 40.0).abs() < 1e-9);
    rc.advance(40.0);
    assert!((rc.get("b").unwrap().world.x - 80.0).abs() < 1e-9);
}

#[test]
fn snaps_within_epsilon() {
    let mut rc = RemoteCursors::new(160.0, 5.0);
    rc.apply_snapshot(peers(&[("b", 0.0, 0.0)]), "a");
    rc.apply_snapshot(peers(&[("b", 8.0, 0.0)]), "a");
    rc.advance(80.0);
    // Halfway is 4px away, inside the 5px epsilon.
    assert_eq!(rc.get("b").unwrap().world, Point::new(8.0, 0.0));
}

#[test]
fn stale_peer_stays_put() {
    let mut rc = RemoteCursors::default();
    rc.apply_snapshot(peers(&[("b", 10.0, 10.0)]), "a");
    for _ in 0..100 {
        rc.advance(16.0);
    }
    assert_eq!(rc.get("b").unwrap().world, Point::new(10.0, 10.0));
}

#[test]
fn missing_peer_is_removed() {
    let mut rc = RemoteCursors::default();
    rc.apply_snapshot(peers(&[("b", 0.0, 0.0), ("c", 0.0, 0.0)]), "a");
    rc.apply_snapshot(peers(&[("c", 0.0, 0.0)]), "a");
    let ids: Vec<&str> = rc.cursors().map(|c| c.viewer_id.as_str()).collect();
    assert_eq!(ids, vec!["c"]);
}

#[test]
fn rendered_set_equals_presence_minus_self() {
    let mut rc = RemoteCursors::default();
    let snapshots = [
        vec![("a", 0.0, 0.0)],
        vec![("a", 0.0, 0.0), ("b", 1.0, 1.0), ("c", 2.0, 2.0)],
        vec![("c", 2.0, 2.0), ("d", 3.0, 3.0)],
        vec![],
    ];
    for snapshot in snapshots {
        rc.apply_snapshot(peers(&snapshot), "a");
        rc.advance(16.0);
        let mut expected: Vec<&str> = snapshot.iter().map(|(id, _, _)| *id).filter(|id| *id != "a").collect();
        expected.sort_unstable();
        let rendered: Vec<&str> = rc.cursors().map(|c| c.viewer_id.as_str()).collect();
        assert_eq!(rendered, expected);
    }
}

#[test]
fn negative_or_nan_dt_does_not_move() {
    let mut rc = RemoteCursors::default();
    rc.apply_snapshot(peers(&[("b", 0.0, 0.0)]), "a");
    rc.apply_snapshot(peers(&[("b", 100.0, 0.0)]), "a");
    rc.advance(-16.0);
    rc.advance(f64::NAN);
    assert_eq!(rc.get("b").unwrap().world, Point::new(0.0, 0.0));
}

#[test]
fn presence_record_tolerates_missing_labels() {
    let p: CursorPresence = serde_json::from_value(serde_json::json!({ "x": 1.5, "y": -2.0 })).unwrap();
    assert_eq!((p.x, p.y), (1.5, -2.0));
    assert!(p.name.is_empty());
}
