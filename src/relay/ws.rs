//! WebSocket handler — store operations over frames.
//!
//! DESIGN
//! ======
//! On upgrade, opens a store connection for the socket and enters a
//! `select!` loop:
//! - Incoming client frames → parse + dispatch on `store:*` syscalls
//! - Snapshot frames from live subscriptions → forward to client
//!
//! Handler functions are pure business logic: they validate, call the
//! store, and return an `Outcome`. The dispatch layer turns that into reply
//! frames for the sender.
//!
//! PROTOCOL
//! ========
//! | syscall | data | reply |
//! |---------|------|-------|
//! | `store:subscribe` | `collection` | `store:snapshot` items until cancelled, then done |
//! | `store:push` | `collection`, `value` | done with `key` |
//! | `store:set` | `path`, `value` | done |
//! | `store:merge` | `path`, `patch` | done, or error `E_STORE_NOT_FOUND` |
//! | `store:delete` | `path` | done |
//! | `store:on_disconnect` | `path` | done |
//!
//! A cancel frame whose `parent_id` names a subscribe request ends that
//! subscription.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `connection_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Close (clean or not) → abort subscriptions → disconnect the store
//!    connection, which runs its on-disconnect directives

#[cfg(test)]
#[path = "ws_test.rs"]
mod ws_test;

use std::collections::HashMap;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{RelayError, RelayState};
use crate::frame::{Data, Frame, FRAME_CODE, FRAME_MESSAGE, Status};
use crate::store::{CollectionPath, EntryPath, MemoryConnection, RealtimeStore, Snapshot};

const SNAPSHOT_SYSCALL: &str = "store:snapshot";

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. Handlers never send frames directly.
enum Outcome {
    /// Send done+data to sender.
    Reply(Data),
    /// Send empty done to sender.
    Done,
    /// Items follow asynchronously; nothing to send now.
    Streaming,
}

// =============================================================================
// SESSION
// =============================================================================

/// Per-socket state: the store connection and its live subscriptions.
pub(crate) struct Session {
    conn: MemoryConnection,
    /// Subscribe request id → (request, forwarding task).
    subscriptions: HashMap<Uuid, (Frame, JoinHandle<()>)>,
    client_tx: mpsc::Sender<Frame>,
}

impl Session {
    pub(crate) fn new(conn: MemoryConnection, client_tx: mpsc::Sender<Frame>) -> Self {
        Self { conn, subscriptions: HashMap::new(), client_tx }
    }

    /// End a subscription. Returns its request so a done can be sent.
    fn unsubscribe(&mut self, request_id: Uuid) -> Option<Frame> {
        let (req, task) = self.subscriptions.remove(&request_id)?;
        task.abort();
        Some(req)
    }

    /// Abort every subscription and run the connection's directives.
    pub(crate) fn close(&mut self) {
        for (_, (_, task)) in self.subscriptions.drain() {
            task.abort();
        }
        self.conn.disconnect();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<RelayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: RelayState) {
    // Per-socket channel for snapshot frames from subscription tasks.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);
    let mut session = Session::new(state.store.connect(), client_tx);
    let connection_id = session.conn.id();

    let welcome = Frame::request("session:connected", Data::new()).with_data("connection_id", connection_id);
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(connection_id, "ws: client connected");

    'session: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(&mut session, text.as_str()).await;
                        for frame in replies {
                            if send_frame(&mut socket, &frame).await.is_err() {
                                break 'session;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    session.close();
    info!(connection_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
///
/// Keeps socket transport separate from frame handling so tests can drive
/// dispatch without a live socket.
pub(crate) async fn process_inbound_text(session: &mut Session, text: &str) -> Vec<Frame> {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(connection_id = session.conn.id(), error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new()).with_data(FRAME_MESSAGE, format!("invalid json: {e}"));
            return vec![err];
        }
    };

    if req.status == Status::Cancel {
        let Some(target) = req.parent_id else {
            return vec![req.error("cancel requires parent_id")];
        };
        return match session.unsubscribe(target) {
            Some(subscribe_req) => {
                debug!(connection_id = session.conn.id(), %target, "ws: subscription cancelled");
                vec![subscribe_req.done()]
            }
            None => Vec::new(),
        };
    }

    if is_presence_traffic(&req) {
        debug!(connection_id = session.conn.id(), syscall = %req.syscall, "ws: recv frame");
    } else {
        info!(connection_id = session.conn.id(), id = %req.id, syscall = %req.syscall, "ws: recv frame");
    }

    let result = match req.prefix() {
        "store" => handle_store(session, &req).await,
        prefix => return vec![req.error(format!("unknown prefix: {prefix}"))],
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::Streaming) => Vec::new(),
        Err(e) => vec![req.error_from(&e)],
    }
}

// =============================================================================
// STORE HANDLERS
// =============================================================================

async fn handle_store(session: &mut Session, req: &Frame) -> Result<Outcome, RelayError> {
    match req.op() {
        "subscribe" => {
            if session.subscriptions.contains_key(&req.id) {
                return Err(RelayError::DuplicateSubscription(req.id));
            }
            let collection = CollectionPath::parse(required_str(req, "collection")?)?;
            let mut subscription = session.conn.subscribe(&collection).await?;
            let tx = session.client_tx.clone();
            let subscribe_req = req.clone();
            let task = tokio::spawn(async move {
                while let Some(snapshot) = subscription.next().await {
                    let frame = snapshot_frame(&subscribe_req, &collection, &snapshot);
                    if tx.send(frame).await.is_err() {
                        break;
                    }
                }
            });
            session.subscriptions.insert(req.id, (req.clone(), task));
            Ok(Outcome::Streaming)
        }
        "push" => {
            let collection = CollectionPath::parse(required_str(req, "collection")?)?;
            let value = required_value(req, "value")?;
            let key = session.conn.push(&collection, value).await?;
            let mut data = Data::new();
            data.insert("key".into(), Value::String(key));
            Ok(Outcome::Reply(data))
        }
        "set" => {
            let path = EntryPath::parse(required_str(req, "path")?)?;
            session.conn.set(&path, required_value(req, "value")?).await?;
            Ok(Outcome::Done)
        }
        "merge" => {
            let path = EntryPath::parse(required_str(req, "path")?)?;
            let Value::Object(patch) = required_value(req, "patch")? else {
                return Err(RelayError::MissingField("patch object"));
            };
            session.conn.merge(&path, patch).await?;
            Ok(Outcome::Done)
        }
        "delete" => {
            let path = EntryPath::parse(required_str(req, "path")?)?;
            session.conn.delete(&path).await?;
            Ok(Outcome::Done)
        }
        "on_disconnect" => {
            let path = EntryPath::parse(required_str(req, "path")?)?;
            session.conn.on_disconnect_delete(&path).await?;
            Ok(Outcome::Done)
        }
        op => Err(RelayError::UnknownOp(op.to_string())),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn required_str<'a>(req: &'a Frame, key: &'static str) -> Result<&'a str, RelayError> {
    req.str_field(key).ok_or(RelayError::MissingField(key))
}

fn required_value(req: &Frame, key: &'static str) -> Result<Value, RelayError> {
    req.data.get(key).cloned().ok_or(RelayError::MissingField(key))
}

fn snapshot_frame(subscribe_req: &Frame, collection: &CollectionPath, snapshot: &Snapshot) -> Frame {
    let mut data = Data::new();
    data.insert("collection".into(), Value::String(collection.to_string()));
    data.insert("entries".into(), snapshot.to_value());
    let mut frame = subscribe_req.item(data);
    frame.syscall = SNAPSHOT_SYSCALL.into();
    frame
}

/// Cursor writes and snapshots are high-volume; keep them out of info logs.
fn is_presence_traffic(frame: &Frame) -> bool {
    ["path", "collection"]
        .iter()
        .filter_map(|key| frame.str_field(key))
        .any(|path| path.contains("/presence/"))
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame.str_field(FRAME_CODE).unwrap_or("-");
        let message = frame.str_field(FRAME_MESSAGE).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if frame.syscall != SNAPSHOT_SYSCALL {
        debug!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}
