use glow::HasContext;

use greenroom_core::EngineError;
use greenroom_runtime::FrameView;

/// The one frame texture a pipeline owns. Storage is respecified on the same object when the
/// frame size changes; every other upload is a sub-image replace.
#[derive(Debug)]
pub struct FrameTexture {
    tex: glow::NativeTexture,
    w: i32,
    h: i32,
}

impl FrameTexture {
    /// Clamp-to-edge, linear filtering, no mipmaps. No storage until the first upload.
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, EngineError> {
        let tex = gl
            .create_texture()
            .map_err(|e| EngineError::GlCreate(format!("create_texture failed: {e:?}")))?;

        gl.bind_texture(glow::TEXTURE_2D, Some(tex));
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MIN_FILTER,
            glow::LINEAR as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MAG_FILTER,
            glow::LINEAR as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_S,
            glow::CLAMP_TO_EDGE as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_T,
            glow::CLAMP_TO_EDGE as i32,
        );
        gl.bind_texture(glow::TEXTURE_2D, None);

        Ok(Self { tex, w: 0, h: 0 })
    }

    /// Binds to texture unit 0 and replaces the contents with `frame` (RGB8, top row first).
    pub unsafe fn upload(&mut self, gl: &glow::Context, frame: &FrameView<'_>) {
        let (w, h) = (frame.width as i32, frame.height as i32);

        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.tex));
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);

        if (w, h) != (self.w, self.h) {
            tracing::debug!(w, h, "respecifying frame texture storage");
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGB8 as i32,
                w,
                h,
                0,
                glow::RGB,
                glow::UNSIGNED_BYTE,
                None,
            );
            self.w = w;
            self.h = h;
        }

        gl.tex_sub_image_2d(
            glow::TEXTURE_2D,
            0,
            0,
            0,
            w,
            h,
            glow::RGB,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(frame.rgb),
        );
    }

    pub unsafe fn bind(&self, gl: &glow::Context) {
        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.tex));
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_texture(self.tex);
    }
}
