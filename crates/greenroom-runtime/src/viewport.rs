use crate::backend::KeyerBackend;
use crate::source::RenderTarget;

/// Match the render target to the source's native size.
///
/// Resizes the target and resets the viewport only when the size differs; returns whether it
/// did. This is the only path that changes the target size.
pub fn sync_viewport<T, B>(target: &mut T, backend: &mut B, native: (u32, u32)) -> bool
where
    T: RenderTarget + ?Sized,
    B: KeyerBackend + ?Sized,
{
    let current = target.size();
    if current == native {
        return false;
    }

    let (w, h) = native;
    tracing::info!(
        from_w = current.0,
        from_h = current.1,
        to_w = w,
        to_h = h,
        "source resolution changed; resizing render target"
    );
    target.set_size(w, h);
    backend.set_viewport(w, h);
    true
}
