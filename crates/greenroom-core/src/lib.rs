#![forbid(unsafe_code)]

//! greenroom core: key configuration, chroma math and the engine error taxonomy.
//!
//! This crate is **contract-only**: no GL handles, no windowing, no decoder processes.
//! Runtimes and inputs depend on it; it depends on nothing but serde.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod color;
pub mod config;
pub mod error;
pub mod preset;

pub use color::{
    alpha_mask, chroma_distance, key_pixel, key_rgb_frame, luma, matte_stats, premultiply,
    spill_mask, to_chroma_plane, MatteStats,
};
pub use config::{
    load_key_config, parse_key_config, ChromaKeyConfig, ConfigIssue, DEFAULT_CURVE,
    MIN_THRESHOLD,
};
pub use error::EngineError;
pub use preset::{KeyPreset, KeyPresetSet};
