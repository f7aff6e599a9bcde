use glow::HasContext;

use greenroom_core::EngineError;
use greenroom_runtime::KeyUniforms;

use crate::shader::ShaderAsset;

type UniformLocation = <glow::Context as HasContext>::UniformLocation;

pub const UNIFORM_NAMES: [&str; 9] = [
    "u_frame",
    "u_frame_width",
    "u_frame_height",
    "u_key_color",
    "u_similarity",
    "u_smoothness",
    "u_spill",
    "u_curve",
    "u_premultiply",
];

/// Alpha convention of the color the key program writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputAlpha {
    /// Color as keyed; alpha alongside. What readback and matte analysis expect.
    #[default]
    Straight,
    /// Color scaled by alpha. What transparent window compositors expect.
    Premultiplied,
}

impl OutputAlpha {
    fn uniform_value(self) -> f32 {
        match self {
            OutputAlpha::Straight => 0.0,
            OutputAlpha::Premultiplied => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    fn gl_kind(self) -> u32 {
        match self {
            Stage::Vertex => glow::VERTEX_SHADER,
            Stage::Fragment => glow::FRAGMENT_SHADER,
        }
    }

    fn compile_error(self, log: String) -> EngineError {
        match self {
            Stage::Vertex => EngineError::VertexCompile(log),
            Stage::Fragment => EngineError::FragmentCompile(log),
        }
    }
}

/// Compile one stage. On failure the shader object is already deleted.
unsafe fn compile_stage(
    gl: &glow::Context,
    stage: Stage,
    src: &str,
) -> Result<glow::NativeShader, EngineError> {
    let shader = gl
        .create_shader(stage.gl_kind())
        .map_err(|e| EngineError::GlCreate(format!("create_shader({stage:?}): {e}")))?;
    gl.shader_source(shader, src);
    gl.compile_shader(shader);
    if gl.get_shader_compile_status(shader) {
        return Ok(shader);
    }
    let log = gl.get_shader_info_log(shader);
    gl.delete_shader(shader);
    Err(stage.compile_error(log))
}

/// Compile both stages and link them. Stage objects never outlive this call.
pub unsafe fn compile_program(
    gl: &glow::Context,
    vert_src: &str,
    frag_src: &str,
) -> Result<glow::NativeProgram, EngineError> {
    let vs = compile_stage(gl, Stage::Vertex, vert_src)?;
    let fs = match compile_stage(gl, Stage::Fragment, frag_src) {
        Ok(fs) => fs,
        Err(e) => {
            gl.delete_shader(vs);
            return Err(e);
        }
    };

    let program = match gl.create_program() {
        Ok(p) => p,
        Err(e) => {
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(EngineError::GlCreate(format!("create_program: {e}")));
        }
    };
    for shader in [vs, fs] {
        gl.attach_shader(program, shader);
    }
    gl.link_program(program);
    for shader in [vs, fs] {
        gl.detach_shader(program, shader);
        gl.delete_shader(shader);
    }

    if !gl.get_program_link_status(program) {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        return Err(EngineError::Link(log));
    }
    Ok(program)
}

/// Locations of the key program's uniforms. `None` when the driver optimized one out;
/// writes to a missing location are no-ops.
#[derive(Debug)]
struct UniformTable {
    frame: Option<UniformLocation>,
    frame_width: Option<UniformLocation>,
    frame_height: Option<UniformLocation>,
    key_color: Option<UniformLocation>,
    similarity: Option<UniformLocation>,
    smoothness: Option<UniformLocation>,
    spill: Option<UniformLocation>,
    curve: Option<UniformLocation>,
    premultiply: Option<UniformLocation>,
}

impl UniformTable {
    unsafe fn resolve(gl: &glow::Context, program: glow::NativeProgram, origin: &str) -> Self {
        let mut locs = UNIFORM_NAMES.map(|name| {
            let loc = gl.get_uniform_location(program, name);
            if loc.is_none() {
                tracing::debug!(origin, uniform = name, "uniform not active in program");
            }
            loc
        });
        let mut take = |i: usize| locs[i].take();
        Self {
            frame: take(0),
            frame_width: take(1),
            frame_height: take(2),
            key_color: take(3),
            similarity: take(4),
            smoothness: take(5),
            spill: take(6),
            curve: take(7),
            premultiply: take(8),
        }
    }
}

/// The linked key program plus its uniform table.
#[derive(Debug)]
pub struct RenderProgram {
    program: glow::NativeProgram,
    uniforms: UniformTable,
}

impl RenderProgram {
    pub unsafe fn new(gl: &glow::Context, asset: &ShaderAsset) -> Result<Self, EngineError> {
        asset.validate()?;
        let program = compile_program(gl, &asset.vert, &asset.frag)?;
        let uniforms = UniformTable::resolve(gl, program, &asset.origin);
        tracing::info!(origin = %asset.origin, "key program linked");
        Ok(Self { program, uniforms })
    }

    pub unsafe fn bind(&self, gl: &glow::Context) {
        gl.use_program(Some(self.program));
    }

    /// Writes every uniform. The texture sampler is pinned to unit 0.
    pub unsafe fn set_uniforms(&self, gl: &glow::Context, u: &KeyUniforms) {
        let t = &self.uniforms;
        let c = &u.config;
        gl.use_program(Some(self.program));
        gl.uniform_1_i32(t.frame.as_ref(), 0);
        gl.uniform_1_f32(t.frame_width.as_ref(), u.frame_width as f32);
        gl.uniform_1_f32(t.frame_height.as_ref(), u.frame_height as f32);
        gl.uniform_3_f32(
            t.key_color.as_ref(),
            c.key_color[0],
            c.key_color[1],
            c.key_color[2],
        );
        gl.uniform_1_f32(t.similarity.as_ref(), c.similarity);
        gl.uniform_1_f32(t.smoothness.as_ref(), c.smoothness);
        gl.uniform_1_f32(t.spill.as_ref(), c.spill);
        gl.uniform_1_f32(t.curve.as_ref(), c.curve);
    }

    pub unsafe fn set_output_alpha(&self, gl: &glow::Context, alpha: OutputAlpha) {
        gl.use_program(Some(self.program));
        gl.uniform_1_f32(self.uniforms.premultiply.as_ref(), alpha.uniform_value());
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_program(self.program);
    }
}

/// Clip-space corners in fan order.
pub const QUAD_CORNERS: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// Static 4-vertex quad drawn as a triangle fan.
#[derive(Debug)]
pub struct FullscreenQuad {
    vao: glow::NativeVertexArray,
    vbo: glow::NativeBuffer,
}

impl FullscreenQuad {
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, EngineError> {
        let vao = gl
            .create_vertex_array()
            .map_err(|e| EngineError::GlCreate(format!("create_vertex_array: {e}")))?;
        let vbo = gl
            .create_buffer()
            .map_err(|e| EngineError::GlCreate(format!("create_buffer: {e}")))?;

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&QUAD_CORNERS),
            glow::STATIC_DRAW,
        );

        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 2 * 4, 0);

        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        gl.bind_vertex_array(None);

        Ok(Self { vao, vbo })
    }

    pub unsafe fn draw(&self, gl: &glow::Context) {
        gl.bind_vertex_array(Some(self.vao));
        gl.draw_arrays(glow::TRIANGLE_FAN, 0, QUAD_CORNERS.len() as i32);
        gl.bind_vertex_array(None);
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_vertex_array(self.vao);
        gl.delete_buffer(self.vbo);
    }
}
