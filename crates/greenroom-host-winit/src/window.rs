use std::ffi::CString;
use std::num::NonZeroU32;

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextAttributesBuilder, NotCurrentGlContextSurfaceAccessor, PossiblyCurrentContext,
};
use glutin::display::GetGlDisplay;
use glutin::prelude::{GlConfig, GlDisplay, GlSurface};
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasRawWindowHandle;
use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use greenroom_core::EngineError;
use greenroom_runtime::RenderTarget;

use crate::event_loop::UserEvent;

#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    /// Initial size before the first frame arrives.
    pub initial_size: (u32, u32),
    /// Composite the keyed output over the desktop where the platform allows it.
    pub transparent: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "greenroom".to_string(),
            initial_size: (960, 540),
            transparent: true,
        }
    }
}

/// The on-screen canvas. Its size is changed only through [`RenderTarget::set_size`].
pub struct WindowTarget {
    window: Window,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    size: (u32, u32),
}

impl WindowTarget {
    pub fn window(&self) -> &Window {
        &self.window
    }
}

fn non_zero(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v).unwrap_or(NonZeroU32::MIN)
}

impl RenderTarget for WindowTarget {
    /// Starts at 0x0 so the first cycle always syncs to the source.
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.window.set_inner_size(PhysicalSize::new(width, height));
        self.surface
            .resize(&self.context, non_zero(width), non_zero(height));
        self.size = (width, height);
    }

    fn present(&mut self) {
        if let Err(e) = self.surface.swap_buffers(&self.context) {
            tracing::warn!("swap_buffers failed: {e}");
        }
    }
}

impl std::fmt::Debug for WindowTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowTarget")
            .field("window", &self.window.id())
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

fn unavailable(what: &str, e: impl std::fmt::Display) -> EngineError {
    EngineError::ContextUnavailable(format!("{what}: {e}"))
}

/// Create the window, a current GL context on it, and a glow context for the runtime.
pub fn make_gl(
    event_loop: &EventLoop<UserEvent>,
    opts: &WindowOptions,
) -> Result<(WindowTarget, glow::Context), EngineError> {
    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .with_transparency(opts.transparent)
        .with_depth_size(0)
        .with_stencil_size(0);

    let display_builder = DisplayBuilder::new().with_window_builder(Some(
        WindowBuilder::new()
            .with_title(&opts.title)
            .with_inner_size(PhysicalSize::new(opts.initial_size.0, opts.initial_size.1))
            .with_resizable(false)
            .with_transparent(opts.transparent),
    ));

    let (window, gl_config) = display_builder
        .build(event_loop, template, |configs| {
            // glutin reports an error instead of calling the picker with no configs.
            configs
                .reduce(|a, b| if a.num_samples() > b.num_samples() { a } else { b })
                .expect("glutin offered no GL configs")
        })
        .map_err(|e| unavailable("no usable GL config", e))?;

    let window = window
        .ok_or_else(|| EngineError::ContextUnavailable("window creation failed".to_string()))?;
    let raw_window_handle = window.raw_window_handle();

    let gl_display = gl_config.display();

    let context_attributes = ContextAttributesBuilder::new().build(Some(raw_window_handle));
    let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
        .map_err(|e| unavailable("create_context", e))?;

    let size = window.inner_size();
    let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        non_zero(size.width),
        non_zero(size.height),
    );

    let surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs) }
        .map_err(|e| unavailable("create_window_surface", e))?;
    let context = not_current
        .make_current(&surface)
        .map_err(|e| unavailable("make_current", e))?;

    let gl = unsafe {
        glow::Context::from_loader_function(|s| match CString::new(s) {
            Ok(name) => gl_display.get_proc_address(&name) as *const _,
            Err(_) => std::ptr::null(),
        })
    };

    tracing::info!(
        title = %opts.title,
        transparent = gl_config.supports_transparency().unwrap_or(false),
        "GL context ready"
    );

    Ok((
        WindowTarget {
            window,
            surface,
            context,
            size: (0, 0),
        },
        gl,
    ))
}
