#![allow(clippy::float_cmp)]

use canvas::camera::Point;
use serde_json::json;

use super::*;
use crate::store::{MemoryConnection, MemoryStore};

const BOARD: &str = "board-x";

async fn put_cursor(conn: &MemoryConnection, viewer: &str, x: f64, y: f64) {
    let slot = CollectionPath::cursors(BOARD).entry(viewer);
    conn.set(&slot, json!({ "x": x, "y": y, "tag": format!("@{viewer}"), "name": viewer, "color": "#2f9e44" }))
        .await
        .expect("set cursor");
}

async fn subscriber(store: &MemoryStore, self_id: &str) -> PresenceSubscriber {
    PresenceSubscriber::subscribe(Arc::new(store.connect()), BOARD, self_id, &CanvasConfig::default())
        .await
        .expect("subscribe")
}

#[tokio::test]
async fn peers_appear_without_jump_and_self_is_excluded() {
    let store = MemoryStore::new();
    let peer = store.connect();
    put_cursor(&peer, "me", 1.0, 1.0).await;
    put_cursor(&peer, "bo", 300.0, 200.0).await;

    let mut sub = subscriber(&store, "me").await;
    let cursors = sub.frame(16.0);
    assert_eq!(cursors.len(), 1);
    let bo = cursors.get("bo").expect("peer");
    assert_eq!(bo.world, Point::new(300.0, 200.0));
    assert_eq!(bo.tag, "@bo");
    assert!(cursors.get("me").is_none());
}

#[tokio::test]
async fn target_change_eases_then_lands_exactly() {
    let store = MemoryStore::new();
    let peer = store.connect();
    put_cursor(&peer, "bo", 0.0, 0.0).await;
    let mut sub = subscriber(&store, "me").await;

    put_cursor(&peer, "bo", 160.0, 80.0).await;
    let first = sub.frame(16.0).get("bo").expect("peer").world;
    assert!(first.x > 0.0 && first.x < 160.0);
    assert!(first.y > 0.0 && first.y < 80.0);

    let mut elapsed = 16.0;
    while elapsed < 160.0 {
        let at = sub.frame(16.0).get("bo").expect("peer").world;
        assert!(at.x <= 160.0 && at.y <= 80.0, "overshot at {at:?}");
        elapsed += 16.0;
    }
    assert_eq!(sub.cursors().get("bo").expect("peer").world, Point::new(160.0, 80.0));
}

#[tokio::test]
async fn removed_peer_disappears_next_frame() {
    let store = MemoryStore::new();
    let peer = store.connect();
    put_cursor(&peer, "bo", 10.0, 10.0).await;
    let mut sub = subscriber(&store, "me").await;
    assert_eq!(sub.frame(16.0).len(), 1);

    peer.delete(&CollectionPath::cursors(BOARD).entry("bo")).await.expect("delete");
    assert!(sub.frame(16.0).is_empty());
}

#[tokio::test]
async fn silent_peer_stays_put() {
    let store = MemoryStore::new();
    let peer = store.connect();
    put_cursor(&peer, "bo", 42.0, 24.0).await;
    let mut sub = subscriber(&store, "me").await;

    for _ in 0..100 {
        sub.frame(16.0);
    }
    assert_eq!(sub.rendered()[0].world, Point::new(42.0, 24.0));
}

#[tokio::test]
async fn malformed_cursor_is_skipped() {
    let store = MemoryStore::new();
    let peer = store.connect();
    put_cursor(&peer, "bo", 1.0, 2.0).await;
    peer.set(&CollectionPath::cursors(BOARD).entry("junk"), json!({ "x": "left" }))
        .await
        .expect("set junk");

    let mut sub = subscriber(&store, "me").await;
    let cursors = sub.frame(0.0);
    assert_eq!(cursors.len(), 1);
    assert!(cursors.get("junk").is_none());
}

#[tokio::test]
async fn poll_reports_new_snapshots_only() {
    let store = MemoryStore::new();
    let peer = store.connect();
    let mut sub = subscriber(&store, "me").await;
    assert!(!sub.poll());

    put_cursor(&peer, "bo", 1.0, 2.0).await;
    assert!(sub.poll());
    assert!(!sub.poll());
}
