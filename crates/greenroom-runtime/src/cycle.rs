use greenroom_core::ConfigIssue;

use crate::backend::{KeyUniforms, KeyerBackend};
use crate::source::{ConfigProvider, FrameSource, RenderTarget};
use crate::viewport::sync_viewport;

/// What one fired cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Frame uploaded and drawn.
    Drawn,
    /// The source had no frame with known dimensions; nothing touched, retry next cycle.
    NoFrame,
    /// The scheduler was stopped when the cycle fired; no GPU work.
    Skipped,
}

/// The body the scheduler fires.
pub trait Cycle {
    fn run_cycle(&mut self) -> CycleOutcome;
}

/// Source → viewport sync → upload → uniforms → draw → present.
pub struct KeyingCycle<S, T, B, C> {
    source: S,
    target: T,
    backend: B,
    config: C,
    /// Fields substituted on the previous cycle, so a persisting bad value is logged once.
    last_issues: Vec<&'static str>,
}

impl<S, T, B, C> KeyingCycle<S, T, B, C>
where
    S: FrameSource,
    T: RenderTarget,
    B: KeyerBackend,
    C: ConfigProvider,
{
    pub fn new(source: S, target: T, backend: B, config: C) -> Self {
        Self {
            source,
            target,
            backend,
            config,
            last_issues: Vec::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

fn report_config_issues(last: &mut Vec<&'static str>, issues: &[ConfigIssue]) {
    let fields: Vec<&'static str> = issues.iter().map(ConfigIssue::field).collect();
    if fields == *last {
        return;
    }
    if issues.is_empty() {
        tracing::info!("key config valid again");
    }
    for issue in issues {
        tracing::warn!(field = issue.field(), "invalid key config, substituting: {issue}");
    }
    *last = fields;
}

impl<S, T, B, C> Cycle for KeyingCycle<S, T, B, C>
where
    S: FrameSource,
    T: RenderTarget,
    B: KeyerBackend,
    C: ConfigProvider,
{
    fn run_cycle(&mut self) -> CycleOutcome {
        let Some(frame) = self.source.current_frame() else {
            tracing::trace!("no decoded frame yet; skipping cycle");
            return CycleOutcome::NoFrame;
        };
        if !frame.has_dimensions() {
            tracing::trace!("source dimensions unavailable; skipping cycle");
            return CycleOutcome::NoFrame;
        }
        if !frame.is_well_formed() {
            tracing::warn!(
                width = frame.width,
                height = frame.height,
                bytes = frame.rgb.len(),
                "frame buffer does not match its dimensions; skipping cycle"
            );
            return CycleOutcome::NoFrame;
        }

        sync_viewport(&mut self.target, &mut self.backend, frame.native_size());
        self.backend.upload_frame(&frame);

        let (config, issues) = self.config.snapshot().sanitize();
        report_config_issues(&mut self.last_issues, &issues);

        self.backend.set_uniforms(&KeyUniforms {
            frame_width: frame.width,
            frame_height: frame.height,
            config,
        });
        self.backend.draw();
        self.target.present();

        CycleOutcome::Drawn
    }
}

impl<S, T, B, C> std::fmt::Debug for KeyingCycle<S, T, B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyingCycle")
            .field("last_issues", &self.last_issues)
            .finish_non_exhaustive()
    }
}
