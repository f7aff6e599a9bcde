//! Frame scheduler: when does the next cycle run?
//!
//! Single-threaded and cooperative. The host event loop turns its own events into [`Wake`]s
//! and hands them to [`FrameScheduler::wake`]; the scheduler fires the cycle once the armed
//! wait resolves. There is at most one armed wait, so cycles never overlap.
//!
//! `stop()` only flips the state. A wait armed before the flip may still resolve once; the
//! guard at the top of the fire path turns that into a no-op.

use std::fmt;
use std::time::{Duration, Instant};

use crate::cycle::{Cycle, CycleOutcome};
use crate::source::{FrameListener, FrameSource};

/// 1000/24 ms: pacing used when the source cannot announce frames.
pub const FALLBACK_FRAME_DELAY: Duration = Duration::from_micros(41_667);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    FrameCallback,
    TimerFallback,
}

/// Events the host forwards to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The source announced a newly decoded frame.
    FrameReady,
    /// Time has passed; check timer deadlines.
    Tick,
    /// The display is ready for a redraw.
    RedrawOpportunity,
}

/// The wait currently armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    Frame,
    Timer { deadline: Instant },
    Redraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Fire,
    Wait(Pending),
}

/// How the next cycle is armed. Chosen once, at construction.
pub trait WaitStrategy: fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// The wait to arm after a cycle completes at `now`.
    fn arm(&self, now: Instant) -> Pending;

    /// Feed one event into an armed wait.
    fn advance(&self, pending: Pending, wake: Wake, now: Instant) -> Advance;
}

/// Fire on the source's next decoded frame. Rate-limits to the source's own frame rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCallback;

impl WaitStrategy for FrameCallback {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FrameCallback
    }

    fn arm(&self, _now: Instant) -> Pending {
        Pending::Frame
    }

    fn advance(&self, pending: Pending, wake: Wake, _now: Instant) -> Advance {
        match (pending, wake) {
            (Pending::Frame, Wake::FrameReady) => Advance::Fire,
            _ => Advance::Wait(pending),
        }
    }
}

/// Wait a fixed delay, then the next redraw opportunity.
#[derive(Debug, Clone, Copy)]
pub struct TimerFallback {
    pub delay: Duration,
}

impl Default for TimerFallback {
    fn default() -> Self {
        Self {
            delay: FALLBACK_FRAME_DELAY,
        }
    }
}

impl WaitStrategy for TimerFallback {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TimerFallback
    }

    fn arm(&self, now: Instant) -> Pending {
        Pending::Timer {
            deadline: now + self.delay,
        }
    }

    fn advance(&self, pending: Pending, wake: Wake, now: Instant) -> Advance {
        match (pending, wake) {
            (Pending::Timer { deadline }, Wake::Tick) if now >= deadline => {
                Advance::Wait(Pending::Redraw)
            }
            (Pending::Redraw, Wake::RedrawOpportunity) => Advance::Fire,
            _ => Advance::Wait(pending),
        }
    }
}

/// `Stopped`/`Running` state machine plus the one armed wait.
#[derive(Debug)]
pub struct FrameScheduler {
    state: ScheduleState,
    strategy: Box<dyn WaitStrategy>,
    pending: Option<Pending>,
}

impl FrameScheduler {
    pub fn new(strategy: Box<dyn WaitStrategy>) -> Self {
        Self {
            state: ScheduleState::Stopped,
            strategy,
            pending: None,
        }
    }

    pub fn with_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::FrameCallback => Self::new(Box::new(FrameCallback)),
            StrategyKind::TimerFallback => Self::new(Box::<TimerFallback>::default()),
        }
    }

    /// One-time capability probe: frame-driven if `source` accepts `listener`, timer-driven
    /// otherwise.
    pub fn probe<S>(source: &mut S, listener: FrameListener) -> Self
    where
        S: FrameSource + ?Sized,
    {
        let kind = if source.subscribe_frames(listener) {
            StrategyKind::FrameCallback
        } else {
            StrategyKind::TimerFallback
        };
        tracing::info!(strategy = ?kind, "frame scheduler strategy selected");
        Self::with_kind(kind)
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ScheduleState::Running
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    /// When the host should send the next [`Wake::Tick`].
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.pending {
            Some(Pending::Timer { deadline }) => Some(deadline),
            _ => None,
        }
    }

    /// True when the host should request a redraw to resolve the armed wait.
    pub fn wants_redraw(&self) -> bool {
        self.pending == Some(Pending::Redraw)
    }

    /// `Stopped -> Running`, then run the first cycle synchronously.
    ///
    /// Returns `None` if already running.
    pub fn start(&mut self, cycle: &mut dyn Cycle, now: Instant) -> Option<CycleOutcome> {
        if self.is_running() {
            tracing::debug!("start() while running; ignored");
            return None;
        }
        self.state = ScheduleState::Running;
        tracing::debug!("frame scheduler started");
        Some(self.fire(cycle, now))
    }

    /// `Running -> Stopped`. An already-armed wait is not retracted.
    pub fn stop(&mut self) {
        if self.state == ScheduleState::Stopped {
            return;
        }
        self.state = ScheduleState::Stopped;
        tracing::debug!(pending = ?self.pending, "frame scheduler stopped");
    }

    /// Feed a host event. Returns the outcome if the event fired a cycle.
    pub fn wake(
        &mut self,
        wake: Wake,
        now: Instant,
        cycle: &mut dyn Cycle,
    ) -> Option<CycleOutcome> {
        let pending = self.pending?;
        match self.strategy.advance(pending, wake, now) {
            Advance::Wait(next) => {
                self.pending = Some(next);
                None
            }
            Advance::Fire => {
                self.pending = None;
                Some(self.fire(cycle, now))
            }
        }
    }

    fn fire(&mut self, cycle: &mut dyn Cycle, now: Instant) -> CycleOutcome {
        if self.state == ScheduleState::Stopped {
            tracing::debug!("armed cycle fired after stop; skipped");
            return CycleOutcome::Skipped;
        }

        let outcome = cycle.run_cycle();

        // Second guard: a stopped scheduler never re-arms.
        if self.state == ScheduleState::Stopped {
            return outcome;
        }
        self.pending = Some(self.strategy.arm(now));
        outcome
    }
}
