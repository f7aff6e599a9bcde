//! Capabilities consumed by a keying pipeline.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use greenroom_core::ChromaKeyConfig;

/// Called from the producer's thread whenever a new frame has been decoded.
pub type FrameListener = Box<dyn Fn() + Send + 'static>;

/// Borrowed view of one decoded frame: RGB8, row-major, top row first, tightly packed.
#[derive(Clone, Copy)]
pub struct FrameView<'a> {
    pub width: u32,
    pub height: u32,
    pub rgb: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn new(width: u32, height: u32, rgb: &'a [u8]) -> Self {
        Self { width, height, rgb }
    }

    #[inline]
    pub fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// False while the source has not learned its resolution yet.
    #[inline]
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Buffer length matches `width * height * 3`.
    pub fn is_well_formed(&self) -> bool {
        self.rgb.len() as u64 == u64::from(self.width) * u64::from(self.height) * 3
    }
}

impl fmt::Debug for FrameView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameView")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgb.len())
            .finish()
    }
}

/// A live or looping video source.
pub trait FrameSource {
    /// Latch and return the newest decoded frame. `None` until the first frame decodes.
    fn current_frame(&mut self) -> Option<FrameView<'_>>;

    /// Capability probe: register `listener` to be called when a decoded frame is waiting.
    /// Sources call it once per latch, not once per decoded frame, so a burst fires one cycle.
    ///
    /// Returns `false` (dropping the listener) when the source cannot announce frames; the
    /// scheduler then falls back to timer pacing.
    fn subscribe_frames(&mut self, listener: FrameListener) -> bool {
        let _ = listener;
        false
    }
}

/// Surface the keyed RGBA output is drawn into.
pub trait RenderTarget {
    fn size(&self) -> (u32, u32);

    /// Only called by viewport sync, and only when the size actually changes.
    fn set_size(&mut self, width: u32, height: u32);

    /// Make the finished cycle visible (buffer swap). Default: nothing to do.
    fn present(&mut self) {}
}

/// Zero-argument read of the current key config. Called once per cycle; must be cheap and
/// side-effect free.
pub trait ConfigProvider {
    fn snapshot(&self) -> ChromaKeyConfig;
}

impl<F> ConfigProvider for F
where
    F: Fn() -> ChromaKeyConfig,
{
    fn snapshot(&self) -> ChromaKeyConfig {
        self()
    }
}

/// Config cell shared between the event-loop thread's controls and the cycle.
#[derive(Clone, Default)]
pub struct SharedKeyConfig(Rc<Cell<ChromaKeyConfig>>);

impl SharedKeyConfig {
    pub fn new(config: ChromaKeyConfig) -> Self {
        Self(Rc::new(Cell::new(config)))
    }

    pub fn get(&self) -> ChromaKeyConfig {
        self.0.get()
    }

    pub fn set(&self, config: ChromaKeyConfig) {
        self.0.set(config);
    }

    pub fn update(&self, f: impl FnOnce(&mut ChromaKeyConfig)) {
        let mut cfg = self.0.get();
        f(&mut cfg);
        self.0.set(cfg);
    }
}

impl ConfigProvider for SharedKeyConfig {
    fn snapshot(&self) -> ChromaKeyConfig {
        self.get()
    }
}

impl fmt::Debug for SharedKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedKeyConfig").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_config_updates_are_visible_to_snapshots() {
        let shared = SharedKeyConfig::default();
        let provider = shared.clone();
        shared.update(|c| c.similarity = 0.25);
        assert_eq!(provider.snapshot().similarity, 0.25);
    }

    #[test]
    fn closures_are_providers() {
        let fixed = ChromaKeyConfig {
            spill: 0.3,
            ..Default::default()
        };
        let provider = move || fixed;
        assert_eq!(provider.snapshot(), fixed);
    }

    #[test]
    fn frame_view_checks_length() {
        let buf = [0u8; 12];
        assert!(FrameView::new(2, 2, &buf).is_well_formed());
        assert!(!FrameView::new(3, 2, &buf).is_well_formed());
        assert!(!FrameView::new(0, 2, &buf[..0]).has_dimensions());
    }
}
