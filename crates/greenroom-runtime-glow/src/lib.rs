//! greenroom runtime (glow/OpenGL backend)
//
// Only the keying machinery lives here:
// - compile/link the key program
// - own the full-screen quad and the persistent frame texture
// - draw one keyed frame when the runtime's cycle asks for it
//
// Windowing, pacing and frame decoding belong to the host and input crates.
#![allow(clippy::missing_safety_doc)]

mod keyer;
mod program;
mod shader;
mod texture;

pub use greenroom_core::EngineError;
pub use keyer::GlowKeyer;
pub use program::{
    compile_program, FullscreenQuad, OutputAlpha, RenderProgram, QUAD_CORNERS, UNIFORM_NAMES,
};
pub use shader::{ShaderAsset, CHROMA_KEY_FRAG_FILE, QUAD_VERT_FILE, SHADER_ASSET_TAG};
pub use texture::FrameTexture;
