//! Board geometry and interaction engine for the moodboard canvas.
//!
//! Everything here is synchronous and free of I/O. The engine turns pointer
//! and wheel input into camera changes and persistence [`engine::Action`]s,
//! keeps a local shadow of the board's elements, and eases peer cursors
//! between presence updates. The `moodboard` crate wires these pieces to the
//! realtime store and drives them from async tasks.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Gesture-driven [`engine::EngineCore`] and its emitted actions |
//! | [`doc`] | Element records, size bounds and the local element store |
//! | [`camera`] | Pan/zoom camera and screen/world conversions |
//! | [`input`] | Pointer button, wheel and gesture state types |
//! | [`hit`] | Hit-testing of element bodies, handles and controls |
//! | [`presence`] | Cursor payloads, send throttling and remote-cursor easing |
//! | [`render`] | Screen-space display list for the host to paint |
//! | [`consts`] | Shared numeric constants (zoom limits, element bounds, timing) |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod hit;
pub mod input;
pub mod presence;
pub mod render;
