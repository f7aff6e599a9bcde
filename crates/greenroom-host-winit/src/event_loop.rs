use std::time::Instant;

use winit::event::{ElementState, Event, KeyboardInput, StartCause, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopProxy};

use greenroom_runtime::{
    ConfigProvider, CycleOutcome, FrameListener, FrameScheduler, FrameSource, KeyerBackend,
    KeyingCycle, Wake,
};

use crate::window::WindowTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    /// A decoder thread published a new frame.
    FrameReady,
}

/// Listener that forwards frame announcements from any thread into the event loop.
pub fn frame_listener(proxy: EventLoopProxy<UserEvent>) -> FrameListener {
    Box::new(move || {
        // Fails only once the loop has exited.
        let _ = proxy.send_event(UserEvent::FrameReady);
    })
}

/// Drive `cycle` with `scheduler` until the window closes or Escape is pressed.
///
/// The scheduler starts on the loop's first iteration. `on_idle` runs once per loop
/// iteration before redraws are requested; hosts poll control inputs there.
pub fn run<S, B, C, F>(
    event_loop: EventLoop<UserEvent>,
    mut scheduler: FrameScheduler,
    mut cycle: KeyingCycle<S, WindowTarget, B, C>,
    mut on_idle: F,
) -> !
where
    S: FrameSource + 'static,
    B: KeyerBackend + 'static,
    C: ConfigProvider + 'static,
    F: FnMut(&mut KeyingCycle<S, WindowTarget, B, C>) + 'static,
{
    let mut exiting = false;

    event_loop.run(move |event, _, control_flow| {
        let now = Instant::now();

        let outcome = match event {
            Event::NewEvents(StartCause::Init) => scheduler.start(&mut cycle, now),
            Event::NewEvents(_) => scheduler.wake(Wake::Tick, now, &mut cycle),
            Event::UserEvent(UserEvent::FrameReady) => {
                scheduler.wake(Wake::FrameReady, now, &mut cycle)
            }
            Event::RedrawRequested(_) => {
                scheduler.wake(Wake::RedrawOpportunity, now, &mut cycle)
            }
            Event::WindowEvent { event, .. } => {
                if is_exit_request(&event) {
                    scheduler.stop();
                    exiting = true;
                }
                None
            }
            Event::MainEventsCleared => {
                on_idle(&mut cycle);
                if scheduler.wants_redraw() {
                    cycle.target().window().request_redraw();
                }
                None
            }
            Event::LoopDestroyed => {
                tracing::info!("event loop closed");
                None
            }
            _ => None,
        };

        if let Some(o) = outcome {
            if o != CycleOutcome::Drawn {
                tracing::trace!(outcome = ?o, "cycle fired without drawing");
            }
        }

        *control_flow = if exiting {
            ControlFlow::Exit
        } else {
            match scheduler.next_deadline() {
                Some(deadline) => ControlFlow::WaitUntil(deadline),
                None => ControlFlow::Wait,
            }
        };
    })
}

fn is_exit_request(event: &WindowEvent<'_>) -> bool {
    matches!(
        event,
        WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                input: KeyboardInput {
                    state: ElementState::Pressed,
                    virtual_keycode: Some(VirtualKeyCode::Escape),
                    ..
                },
                ..
            }
    )
}
