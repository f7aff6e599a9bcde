#![forbid(unsafe_code)]

//! Backend-agnostic keying runtime.
//!
//! This crate defines the capabilities a keying pipeline consumes (frame source, render
//! target, config provider, GPU backend), the per-cycle body, and the frame scheduler that
//! decides when a cycle runs. It owns no GL objects: `greenroom-runtime-glow` implements
//! [`KeyerBackend`] on top of OpenGL, and hosts supply the rest.
//!
//! ```text
//!   FrameScheduler ──fire──▶ KeyingCycle::run_cycle
//!        ▲                       │ sync_viewport → upload_frame → set_uniforms → draw → present
//!        │                       ▼
//!        └──── Wake (frame ready / tick / redraw) ◀── host event loop
//! ```
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod backend;
pub mod cycle;
pub mod scheduler;
pub mod source;
pub mod viewport;

pub use backend::{KeyUniforms, KeyerBackend};
pub use cycle::{Cycle, CycleOutcome, KeyingCycle};
pub use scheduler::{
    Advance, FrameCallback, FrameScheduler, Pending, ScheduleState, StrategyKind,
    TimerFallback, WaitStrategy, Wake, FALLBACK_FRAME_DELAY,
};
pub use source::{
    ConfigProvider, FrameListener, FrameSource, FrameView, RenderTarget, SharedKeyConfig,
};
pub use viewport::sync_viewport;

pub use greenroom_core::{ChromaKeyConfig, EngineError};

#[cfg(test)]
pub(crate) mod testing;
