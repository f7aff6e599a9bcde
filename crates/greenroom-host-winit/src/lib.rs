//! Host glue (policy layer).
//!
//! winit + glutin window/context bootstrap, a [`WindowTarget`] that implements the runtime's
//! `RenderTarget`, and an event loop that feeds the frame scheduler. Kept separate so the
//! runtime stays embed-friendly.

mod event_loop;
mod window;

pub use event_loop::{frame_listener, run, UserEvent};
pub use window::{make_gl, WindowOptions, WindowTarget};
