//! Relay — network access to a shared `MemoryStore`.
//!
//! SYSTEM CONTEXT
//! ==============
//! Browser clients cannot share an in-process store, so the relay exposes one
//! over a WebSocket. Each socket gets its own `MemoryConnection`: closing the
//! socket, cleanly or by losing the network, drops that connection and fires
//! its on-disconnect directives. That is what clears a viewer's cursor when a
//! tab is closed mid-gesture.
//!
//! Routes:
//! - `GET /api/ws`: frame protocol, see [`ws`].
//! - `GET /healthz`: liveness probe.

pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::frame::ErrorCode;
use crate::store::{MemoryStore, StoreError};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0} required")]
    MissingField(&'static str),
    #[error("unknown store op: {0}")]
    UnknownOp(String),
    #[error("request {0} already has a live subscription")]
    DuplicateSubscription(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for RelayError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::UnknownOp(_) => "E_UNKNOWN_OP",
            Self::DuplicateSubscription(_) => "E_DUPLICATE_SUBSCRIPTION",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// STATE + ROUTER
// =============================================================================

/// Shared relay state, injected into handlers via the `State` extractor.
#[derive(Clone, Default)]
pub struct RelayState {
    pub store: MemoryStore,
}

impl RelayState {
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

pub fn app(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the listener fails.
///
/// # Errors
///
/// Returns the bind or accept-loop I/O error.
pub async fn serve(config: &RelayConfig, store: MemoryStore) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "moodboard relay listening");
    axum::serve(listener, app(RelayState::new(store))).await
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
