//! Relay over a real socket: snapshots stream to subscribers and a closed
//! socket fires its on-disconnect directives.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use moodboard::frame::{Data, Frame, Status};
use moodboard::relay::{RelayState, app};
use moodboard::store::MemoryStore;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CURSOR: &str = "boards/b1/presence/cursors/v1";

async fn start_relay(store: MemoryStore) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app(RelayState::new(store))).await.expect("serve");
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (mut ws, _) = connect_async(format!("ws://{addr}/api/ws")).await.expect("connect");
    let welcome = recv(&mut ws).await;
    assert_eq!(welcome.syscall, "session:connected");
    assert!(welcome.data.get("connection_id").and_then(Value::as_u64).is_some());
    ws
}

async fn recv(ws: &mut Client) -> Frame {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame within timeout")
            .expect("socket open")
            .expect("socket ok");
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().expect("text")).expect("frame json");
        }
    }
}

async fn call(ws: &mut Client, syscall: &str, data: Value) -> Frame {
    let data: Data = match data {
        Value::Object(map) => map.into_iter().collect(),
        _ => Data::new(),
    };
    let req = Frame::request(syscall, data);
    let text = serde_json::to_string(&req).expect("serialize");
    ws.send(Message::text(text)).await.expect("send");
    req
}

#[tokio::test]
async fn healthz_answers() {
    let addr = start_relay(MemoryStore::new()).await;
    let mut stream = TcpStream::connect(addr).await.expect("tcp");
    tokio::io::AsyncWriteExt::write_all(&mut stream, b"GET /healthz HTTP/1.1\r\nHost: relay\r\nConnection: close\r\n\r\n")
        .await
        .expect("write");
    let mut response = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response).await.expect("read");
    assert!(response.starts_with("HTTP/1.1 200"));
}

#[tokio::test]
async fn closing_a_socket_clears_its_cursor_for_subscribers() {
    let store = MemoryStore::new();
    let addr = start_relay(store.clone()).await;
    let mut writer = connect(addr).await;
    let mut watcher = connect(addr).await;

    call(&mut writer, "store:on_disconnect", json!({ "path": CURSOR })).await;
    assert_eq!(recv(&mut writer).await.status, Status::Done);
    call(&mut writer, "store:set", json!({ "path": CURSOR, "value": { "x": 4, "y": 2 } })).await;
    assert_eq!(recv(&mut writer).await.status, Status::Done);

    let sub = call(&mut watcher, "store:subscribe", json!({ "collection": "boards/b1/presence/cursors" })).await;
    let snapshot = recv(&mut watcher).await;
    assert_eq!(snapshot.status, Status::Item);
    assert_eq!(snapshot.parent_id, Some(sub.id));
    assert_eq!(snapshot.data.get("entries"), Some(&json!({ "v1": { "x": 4, "y": 2 } })));

    writer.close(None).await.expect("close");
    drop(writer);

    let cleared = recv(&mut watcher).await;
    assert_eq!(cleared.syscall, "store:snapshot");
    assert_eq!(cleared.data.get("entries"), Some(&json!({})));

    watcher.send(Message::text(serde_json::to_string(&Frame::cancel(sub.id)).expect("cancel"))).await.expect("send");
    let done = recv(&mut watcher).await;
    assert_eq!(done.status, Status::Done);
    assert_eq!(done.parent_id, Some(sub.id));
}

#[tokio::test]
async fn element_writes_round_trip_through_the_relay() {
    let store = MemoryStore::new();
    let addr = start_relay(store.clone()).await;
    let mut client = connect(addr).await;

    call(&mut client, "store:push", json!({ "collection": "boards/b1/elements", "value": { "x": 1, "y": 2 } })).await;
    let pushed = recv(&mut client).await;
    assert_eq!(pushed.status, Status::Done);
    let key = pushed.str_field("key").expect("key").to_string();

    let path = format!("boards/b1/elements/{key}");
    call(&mut client, "store:merge", json!({ "path": path, "patch": { "x": 9 } })).await;
    assert_eq!(recv(&mut client).await.status, Status::Done);

    let snap = store.snapshot(&moodboard::store::CollectionPath::elements("b1"));
    assert_eq!(snap.get(&key), Some(&json!({ "x": 9, "y": 2 })));

    call(&mut client, "store:delete", json!({ "path": path })).await;
    assert_eq!(recv(&mut client).await.status, Status::Done);
    call(&mut client, "store:merge", json!({ "path": path, "patch": { "x": 1 } })).await;
    let missing = recv(&mut client).await;
    assert_eq!(missing.status, Status::Error);
    assert_eq!(missing.str_field("code"), Some("E_STORE_NOT_FOUND"));
}
