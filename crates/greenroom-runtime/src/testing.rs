//! Test doubles for the capability traits.

use crate::backend::{KeyUniforms, KeyerBackend};
use crate::source::{FrameListener, FrameSource, FrameView, RenderTarget};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Viewport(u32, u32),
    Upload(u32, u32),
    Uniforms(KeyUniforms),
    Draw,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
}

impl RecordingBackend {
    pub fn draws(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Draw).count()
    }

    pub fn viewports(&self) -> Vec<(u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Viewport(w, h) => Some((*w, *h)),
                _ => None,
            })
            .collect()
    }
}

impl KeyerBackend for RecordingBackend {
    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
    }

    fn upload_frame(&mut self, frame: &FrameView<'_>) {
        self.calls.push(Call::Upload(frame.width, frame.height));
    }

    fn set_uniforms(&mut self, uniforms: &KeyUniforms) {
        self.calls.push(Call::Uniforms(*uniforms));
    }

    fn draw(&mut self) {
        self.calls.push(Call::Draw);
    }
}

#[derive(Debug, Default)]
pub struct TestTarget {
    pub w: u32,
    pub h: u32,
    pub resizes: usize,
    pub presents: usize,
}

impl RenderTarget for TestTarget {
    fn size(&self) -> (u32, u32) {
        (self.w, self.h)
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.w = width;
        self.h = height;
        self.resizes += 1;
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}

/// Source with a settable resolution. Starts with no decoded frame.
#[derive(Default)]
pub struct TestSource {
    pub frame: Option<(u32, u32, Vec<u8>)>,
    pub can_notify: bool,
    pub listener: Option<FrameListener>,
}

impl TestSource {
    pub fn with_size(w: u32, h: u32) -> Self {
        let mut s = Self::default();
        s.set_size(w, h);
        s
    }

    pub fn set_size(&mut self, w: u32, h: u32) {
        self.frame = Some((w, h, vec![0; (w * h * 3) as usize]));
    }

    pub fn announce(&self) {
        if let Some(l) = &self.listener {
            l();
        }
    }
}

impl FrameSource for TestSource {
    fn current_frame(&mut self) -> Option<FrameView<'_>> {
        self.frame
            .as_ref()
            .map(|(w, h, buf)| FrameView::new(*w, *h, buf))
    }

    fn subscribe_frames(&mut self, listener: FrameListener) -> bool {
        if !self.can_notify {
            return false;
        }
        self.listener = Some(listener);
        true
    }
}

impl std::fmt::Debug for TestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSource")
            .field("size", &self.frame.as_ref().map(|(w, h, _)| (*w, *h)))
            .field("can_notify", &self.can_notify)
            .finish()
    }
}
