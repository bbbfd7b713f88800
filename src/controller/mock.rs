//! Scriptable mock controller
//!
//! Stands in for a physical device in tests and in the demo binary: frames
//! are queued up front and served one per poll, with a shared connection
//! toggle so disconnect/reconnect behavior can be driven from the outside.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::controller::{Controller, ControllerFrame, DeviceFamily};

/// Mock device that replays queued frames.
pub struct MockController {
    family: DeviceFamily,
    frames: VecDeque<ControllerFrame>,
    /// Last frame handed out, repeated when the queue runs dry
    held: ControllerFrame,
    connected: Arc<AtomicBool>,
}

impl MockController {
    pub fn new(family: DeviceFamily) -> Self {
        Self {
            family,
            frames: VecDeque::new(),
            held: ControllerFrame::default(),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Queue a frame to be served by a future poll.
    pub fn push_frame(&mut self, frame: ControllerFrame) {
        self.frames.push_back(frame);
    }

    /// Handle for flipping the connection state from another thread.
    pub fn connection_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Controller for MockController {
    fn family(&self) -> DeviceFamily {
        self.family
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn poll(&mut self) -> Option<ControllerFrame> {
        if !self.is_connected() {
            return None;
        }
        if let Some(frame) = self.frames.pop_front() {
            self.held = frame;
        }
        Some(self.held.clone())
    }
}
