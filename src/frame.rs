//! Frame — the message envelope spoken by the store relay.
//!
//! ARCHITECTURE
//! ============
//! Remote clients talk to the relay in frames. A client sends a request
//! frame, the relay dispatches on the syscall prefix, and responses flow back
//! as item/done/error frames correlated by `parent_id`. Live subscriptions
//! stream `store:snapshot` items under the subscribing request's id until
//! the client sends a cancel frame for it.
//!
//! DESIGN
//! ======
//! - Flat data: payload is always `Map<String, Value>`; store values nest
//!   inside a single key.
//! - The relay routes on `syscall` and never inspects unrelated `data` keys.

#[cfg(test)]
#[path = "frame_test.rs"]
mod frame_test;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// Lifecycle position of a frame in a request/response stream.
///
/// Every exchange is `request → item* → done` or `request → error`.
/// A subscription stays open on `item`s until cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Request,
    Item,
    Done,
    Error,
    Cancel,
}

/// The relay's message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    #[serde(default)]
    pub ts: i64,
    pub syscall: String,
    pub status: Status,
    #[serde(default)]
    pub data: Data,
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Entry point for every syscall.
    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self { id: Uuid::new_v4(), parent_id: None, ts: now_ms(), syscall: syscall.into(), status: Status::Request, data }
    }

    /// Create a cancel frame targeting a previously submitted request.
    #[must_use]
    pub fn cancel(target_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(target_id),
            ts: now_ms(),
            syscall: String::new(),
            status: Status::Cancel,
            data: Data::new(),
        }
    }

    /// Create an item response carrying one result.
    #[must_use]
    pub fn item(&self, data: Data) -> Self {
        self.reply(Status::Item, data)
    }

    /// Create a done response. Terminal, carries no data.
    #[must_use]
    pub fn done(&self) -> Self {
        self.reply(Status::Done, Data::new())
    }

    /// Create a done response carrying a final payload. Terminal.
    #[must_use]
    pub fn done_with(&self, data: Data) -> Self {
        self.reply(Status::Done, data)
    }

    /// Create an error response from a plain string. Terminal.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(message.into()));
        self.reply(Status::Error, data)
    }

    /// Create a structured error response from a typed error. Terminal.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_CODE.into(), serde_json::Value::String(err.error_code().to_string()));
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), serde_json::Value::Bool(err.retryable()));
        self.reply(Status::Error, data)
    }

    /// Build a reply frame. Inherits `syscall`; `parent_id` points at `self`.
    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            syscall: self.syscall.clone(),
            status,
            data,
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// ROUTING
// =============================================================================

impl Frame {
    /// Extract the syscall prefix (everything before the first ':').
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.syscall.split_once(':') else {
            return &self.syscall;
        };
        prefix
    }

    /// Extract the operation (everything after the first ':'), or "".
    #[must_use]
    pub fn op(&self) -> &str {
        self.syscall.split_once(':').map_or("", |(_, op)| op)
    }

    /// String field from `data`.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }
}
