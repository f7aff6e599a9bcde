use glow::HasContext;

use greenroom_core::EngineError;
use greenroom_runtime::{FrameView, KeyUniforms, KeyerBackend};

use crate::program::{FullscreenQuad, OutputAlpha, RenderProgram};
use crate::shader::ShaderAsset;
use crate::texture::FrameTexture;

/// OpenGL implementation of [`KeyerBackend`]. Draws into the default framebuffer of the
/// context it was created with.
///
/// Output is straight alpha unless [`GlowKeyer::set_output_alpha`] asks for premultiplied;
/// readback captures are always straight.
pub struct GlowKeyer {
    gl: glow::Context,
    program: RenderProgram,
    quad: FullscreenQuad,
    texture: FrameTexture,
    viewport: (u32, u32),
    output: OutputAlpha,
    readback_requested: bool,
    last_readback: Option<(u32, u32, Vec<u8>)>,
}

impl GlowKeyer {
    /// Compile the key program and allocate the quad and frame texture.
    ///
    /// # Safety
    /// `gl` must be current on the calling thread, and stay current on that thread for every
    /// later call on the returned value, including drop.
    pub unsafe fn new(gl: glow::Context, asset: &ShaderAsset) -> Result<Self, EngineError> {
        let mut program = RenderProgram::new(&gl, asset)?;
        let mut quad = match FullscreenQuad::new(&gl) {
            Ok(q) => q,
            Err(e) => {
                program.destroy(&gl);
                return Err(e);
            }
        };
        let texture = match FrameTexture::new(&gl) {
            Ok(t) => t,
            Err(e) => {
                quad.destroy(&gl);
                program.destroy(&gl);
                return Err(e);
            }
        };

        Ok(Self {
            gl,
            program,
            quad,
            texture,
            viewport: (0, 0),
            output: OutputAlpha::Straight,
            readback_requested: false,
            last_readback: None,
        })
    }

    /// Alpha convention of the presented output. Use `Premultiplied` for transparent windows.
    pub fn set_output_alpha(&mut self, output: OutputAlpha) {
        self.output = output;
    }

    /// Capture the output of the next draw, before it is presented.
    pub fn request_readback(&mut self) {
        self.readback_requested = true;
    }

    /// The capture made by the last requested draw, if it has happened.
    pub fn take_readback(&mut self) -> Option<(u32, u32, Vec<u8>)> {
        self.last_readback.take()
    }

    /// Read the default framebuffer back as RGBA8, top row first. `None` before the first
    /// viewport. Contents are only defined between a draw and the next buffer swap.
    pub fn read_rgba(&self) -> Option<(u32, u32, Vec<u8>)> {
        let (w, h) = self.viewport;
        if w == 0 || h == 0 {
            return None;
        }
        let mut buf = vec![0u8; (w as usize) * (h as usize) * 4];
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            self.gl.read_pixels(
                0,
                0,
                w as i32,
                h as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(&mut buf),
            );
        }
        flip_rows(&mut buf, w as usize * 4);
        Some((w, h, buf))
    }
}

/// Passes one draw makes, in order. The last one is presented; a requested readback is
/// captured after the first, which is straight whenever a readback is pending.
fn draw_passes(readback: bool, output: OutputAlpha) -> &'static [OutputAlpha] {
    match (readback, output) {
        (true, OutputAlpha::Premultiplied) => {
            &[OutputAlpha::Straight, OutputAlpha::Premultiplied]
        }
        (_, OutputAlpha::Straight) => &[OutputAlpha::Straight],
        (false, OutputAlpha::Premultiplied) => &[OutputAlpha::Premultiplied],
    }
}

/// GL reads bottom row first.
fn flip_rows(buf: &mut [u8], stride: usize) {
    if stride == 0 {
        return;
    }
    let rows = buf.len() / stride;
    for y in 0..rows / 2 {
        let (top, bottom) = buf.split_at_mut((rows - 1 - y) * stride);
        top[y * stride..(y + 1) * stride].swap_with_slice(&mut bottom[..stride]);
    }
}

impl KeyerBackend for GlowKeyer {
    fn set_viewport(&mut self, width: u32, height: u32) {
        unsafe {
            self.gl.viewport(0, 0, width as i32, height as i32);
        }
        self.viewport = (width, height);
    }

    fn upload_frame(&mut self, frame: &FrameView<'_>) {
        unsafe {
            self.texture.upload(&self.gl, frame);
        }
    }

    fn set_uniforms(&mut self, uniforms: &KeyUniforms) {
        unsafe {
            self.program.set_uniforms(&self.gl, uniforms);
        }
    }

    fn draw(&mut self) {
        let readback = self.readback_requested;
        for (i, &alpha) in draw_passes(readback, self.output).iter().enumerate() {
            let gl = &self.gl;
            unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                gl.disable(glow::DEPTH_TEST);
                gl.disable(glow::BLEND);
                gl.clear_color(0.0, 0.0, 0.0, 0.0);
                gl.clear(glow::COLOR_BUFFER_BIT);

                self.program.bind(gl);
                self.program.set_output_alpha(gl, alpha);
                self.texture.bind(gl);
                self.quad.draw(gl);
            }

            if readback && i == 0 {
                self.readback_requested = false;
                self.last_readback = self.read_rgba();
            }
        }
        tracing::trace!(viewport = ?self.viewport, output = ?self.output, "keyed frame drawn");
    }
}

impl Drop for GlowKeyer {
    fn drop(&mut self) {
        unsafe {
            self.texture.destroy(&self.gl);
            self.quad.destroy(&self.gl);
            self.program.destroy(&self.gl);
        }
    }
}

impl std::fmt::Debug for GlowKeyer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowKeyer")
            .field("program", &self.program)
            .field("texture", &self.texture)
            .field("viewport", &self.viewport)
            .field("output", &self.output)
            .field("readback_requested", &self.readback_requested)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{draw_passes, flip_rows};
    use crate::program::OutputAlpha;

    #[test]
    fn premultiplied_output_draws_once_without_readback() {
        assert_eq!(
            draw_passes(false, OutputAlpha::Premultiplied),
            &[OutputAlpha::Premultiplied]
        );
        assert_eq!(draw_passes(false, OutputAlpha::Straight), &[OutputAlpha::Straight]);
    }

    #[test]
    fn readback_is_captured_straight_and_presented_as_configured() {
        let passes = draw_passes(true, OutputAlpha::Premultiplied);
        assert_eq!(passes.first(), Some(&OutputAlpha::Straight));
        assert_eq!(passes.last(), Some(&OutputAlpha::Premultiplied));

        assert_eq!(draw_passes(true, OutputAlpha::Straight), &[OutputAlpha::Straight]);
    }

    #[test]
    fn flip_rows_reverses_row_order() {
        let mut buf = vec![1, 1, 2, 2, 3, 3];
        flip_rows(&mut buf, 2);
        assert_eq!(buf, vec![3, 3, 2, 2, 1, 1]);
    }

    #[test]
    fn flip_rows_even_count() {
        let mut buf = vec![1, 2, 3, 4];
        flip_rows(&mut buf, 1);
        assert_eq!(buf, vec![4, 3, 2, 1]);
    }
}
