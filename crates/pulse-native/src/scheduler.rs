use pulse_core::FrameScheduler;
use std::sync::Arc;
use winit::window::Window;

/// Drives ticks off winit redraw requests.
pub struct RedrawScheduler {
    window: Arc<Window>,
    cancelled: bool,
}

impl RedrawScheduler {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            cancelled: false,
        }
    }
}

impl FrameScheduler for RedrawScheduler {
    fn request_tick(&mut self) {
        if !self.cancelled {
            self.window.request_redraw();
        }
    }

    // winit has no way to withdraw a redraw request; a cancelled scheduler
    // simply stops asking and the orchestrator ignores stray ticks.
    fn cancel_tick(&mut self) {
        self.cancelled = true;
    }
}
