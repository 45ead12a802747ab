//! Per-frame sampling loop as an explicit start/cancel pair.
//!
//! At most one frame is outstanding. Each fired frame requests the next one;
//! cancelling drops the outstanding request, and a frame that fires after a
//! cancel (or after a restart) is recognised as stale and ignored.

use std::sync::Arc;

use tracing::trace;

use crate::player::platform::{FrameClock, FrameHandle};

pub struct SamplingLoop {
    clock: Arc<dyn FrameClock>,
    pending: Option<FrameHandle>,
}

impl SamplingLoop {
    pub fn new(clock: Arc<dyn FrameClock>) -> Self {
        Self {
            clock,
            pending: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Schedules the first frame. Does nothing if already running.
    pub fn start(&mut self) {
        if self.pending.is_none() {
            let handle = self.clock.request_frame();
            trace!("sampling loop started with frame {:?}", handle);
            self.pending = Some(handle);
        }
    }

    /// Accepts a fired frame and schedules the next. Returns `false` for
    /// stale frames, which must not be sampled.
    pub fn on_frame(&mut self, handle: FrameHandle) -> bool {
        if self.pending != Some(handle) {
            trace!("ignoring stale frame {:?}", handle);
            return false;
        }
        self.pending = Some(self.clock.request_frame());
        true
    }

    /// Returns whether a frame was outstanding.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                self.clock.cancel_frame(handle);
                trace!("sampling loop cancelled at frame {:?}", handle);
                true
            }
            None => false,
        }
    }
}

impl Drop for SamplingLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}
