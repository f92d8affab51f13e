//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed camera scale.
pub const MIN_SCALE: f64 = 0.25;

/// Largest allowed camera scale.
pub const MAX_SCALE: f64 = 3.0;

/// Exponential zoom rate per wheel pixel. `scale * exp(-dy * k)`.
pub const ZOOM_SENSITIVITY: f64 = 0.0015;

// ── Elements ────────────────────────────────────────────────────

/// Default element bounds, in world pixels.
pub const MIN_ELEMENT_WIDTH: f64 = 180.0;
pub const MAX_ELEMENT_WIDTH: f64 = 560.0;
pub const MIN_ELEMENT_HEIGHT: f64 = 120.0;
pub const MAX_ELEMENT_HEIGHT: f64 = 480.0;

/// Size given to freshly created elements.
pub const DEFAULT_ELEMENT_WIDTH: f64 = 240.0;
pub const DEFAULT_ELEMENT_HEIGHT: f64 = 160.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Side of the square resize handle at the bottom-right corner, in screen pixels.
pub const HANDLE_SIZE_PX: f64 = 14.0;

/// Side of the square remove control at the top-right corner, in screen pixels.
pub const CONTROL_SIZE_PX: f64 = 20.0;

// ── Presence ────────────────────────────────────────────────────

/// Presence broadcast tick.
pub const PRESENCE_TICK_MS: u64 = 180;

/// A still pointer is re-published at least this often.
pub const PRESENCE_KEEPALIVE_MS: i64 = 3_000;

/// Remote cursors ease toward their target over this window.
pub const INTERPOLATION_WINDOW_MS: f64 = 160.0;

/// Below this remaining distance a remote cursor snaps onto its target.
pub const SNAP_EPSILON_PX: f64 = 0.5;

// ── Grid ────────────────────────────────────────────────────────

/// World-space spacing between background grid lines.
pub const GRID_SPACING: f64 = 40.0;

/// Grid lines closer than this on screen are not emitted.
pub const MIN_GRID_SCREEN_SPACING_PX: f64 = 8.0;
