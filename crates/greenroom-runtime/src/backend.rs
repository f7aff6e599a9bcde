use greenroom_core::ChromaKeyConfig;

use crate::source::FrameView;

/// Values written to the key program's uniforms for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyUniforms {
    /// Size of the uploaded frame texture, in pixels.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Already sanitized.
    pub config: ChromaKeyConfig,
}

/// GPU operations one keying cycle needs.
///
/// Implementations own the linked program, the full-screen quad and the persistent frame
/// texture. All calls happen on the thread that owns the GPU context.
pub trait KeyerBackend {
    /// Viewport covering `(0, 0, width, height)`.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Replace the frame texture contents. Must reuse one texture object.
    fn upload_frame(&mut self, frame: &FrameView<'_>);

    fn set_uniforms(&mut self, uniforms: &KeyUniforms);

    /// One draw of the 4-vertex fan.
    fn draw(&mut self);
}
