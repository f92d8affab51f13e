//! Realtime plumbing for the moodboard canvas.
//!
//! The [`canvas`] crate owns geometry and gestures. This crate connects it to
//! a shared realtime store so several viewers see the same board and each
//! other's cursors.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | `RealtimeStore` trait, paths, snapshots and the in-memory store |
//! | [`elements`] | Element persistence adapter and decoded element feed |
//! | [`presence`] | Cursor broadcaster and interpolating subscriber |
//! | [`surface`] | Mounted board surface: input, persistence and frames |
//! | [`retry`] | Backoff policy for durable writes |
//! | [`config`] | Environment-driven tuning and validation |
//! | [`frame`] | Relay message envelope |
//! | [`relay`] | Axum WebSocket relay exposing a `MemoryStore` |

pub use canvas;

pub mod config;
pub mod elements;
pub mod frame;
pub mod presence;
pub mod relay;
pub mod retry;
pub mod store;
pub mod surface;
