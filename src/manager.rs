//! Relay manager
//!
//! Drains every connected controller on a fixed cadence, merges their frames
//! into one canonical state and pushes it into the DSU server. Polling runs
//! on a dedicated thread; frames travel over a bounded channel to a
//! forwarder so a slow push never stalls the poll cadence.

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::controller::Controller;
use crate::dsu::DsuServer;
use crate::inputs::ControllerState;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Manager is already running")]
    AlreadyRunning,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Owns the controller list and the poll/forward worker threads.
pub struct RelayManager {
    server: DsuServer,
    poll_interval: Duration,
    controllers: Arc<Mutex<Vec<Box<dyn Controller>>>>,
    running: Arc<AtomicBool>,
    frame_sender: Sender<ControllerState>,
    frame_receiver: Receiver<ControllerState>,
}

impl RelayManager {
    pub fn new(server: DsuServer, config: &ServerConfig) -> Self {
        let (frame_sender, frame_receiver) = bounded(4);

        Self {
            server,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            controllers: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            frame_sender,
            frame_receiver,
        }
    }

    /// Register a device. Controllers can be added while running.
    pub fn add_controller(&self, controller: Box<dyn Controller>) {
        let mut controllers = self.controllers.lock().unwrap();
        debug!(
            "registered {:?} controller ({} total)",
            controller.family(),
            controllers.len() + 1
        );
        controllers.push(controller);
    }

    /// Spawn the poll and forwarder threads.
    pub fn start(&self) -> Result<(), ManagerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ManagerError::AlreadyRunning);
        }

        info!("Starting relay manager");
        self.start_poll_thread()?;
        self.start_forward_thread()?;
        Ok(())
    }

    pub fn stop(&self) {
        info!("Stopping relay manager");
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn start_poll_thread(&self) -> Result<(), ManagerError> {
        let controllers = Arc::clone(&self.controllers);
        let running = Arc::clone(&self.running);
        let sender = self.frame_sender.clone();
        let interval = self.poll_interval;

        thread::Builder::new()
            .name("pad-poller".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    let frame = Self::poll_once(&controllers);
                    // drop the frame rather than stall the poll cadence
                    if sender.try_send(frame).is_err() {
                        trace!("frame channel full, dropping frame");
                    }
                    thread::sleep(interval);
                }
                debug!("poll thread exited");
            })?;

        Ok(())
    }

    fn start_forward_thread(&self) -> Result<(), ManagerError> {
        let running = Arc::clone(&self.running);
        let receiver = self.frame_receiver.clone();
        let server = self.server.clone();

        thread::Builder::new()
            .name("pad-forwarder".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    match receiver.recv_timeout(Duration::from_millis(100)) {
                        Ok(frame) => server.update_inputs(frame),
                        Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("forward thread exited");
            })?;

        Ok(())
    }

    /// One poll cycle: translate every connected controller and merge the
    /// results into a single canonical frame.
    fn poll_once(controllers: &Arc<Mutex<Vec<Box<dyn Controller>>>>) -> ControllerState {
        let mut merged = ControllerState::new();
        let mut controllers = controllers.lock().unwrap();

        for controller in controllers.iter_mut() {
            if !controller.is_connected() {
                continue;
            }
            let Some(frame) = controller.poll() else {
                warn!("{:?} controller faulted during poll", controller.family());
                continue;
            };

            merged.buttons.merge(&frame.buttons);
            merged.axes.merge(&frame.axes);
            for (mine, theirs) in merged.touch.iter_mut().zip(frame.touch.iter()) {
                if theirs.active {
                    *mine = *theirs;
                }
            }
            if let Some(motion) = frame.motion {
                merged
                    .gyro
                    .update_all(motion.accelerometer, motion.gyroscope);
                merged.motion_timestamp = motion.timestamp_us;
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerFrame, DeviceFamily, MockController, MotionSample};
    use crate::inputs::{AxisFlag, ButtonFlag, Vec3};

    #[test]
    fn poll_once_merges_connected_controllers() {
        let mut left = MockController::new(DeviceFamily::Neptune);
        let mut frame = ControllerFrame::default();
        frame.buttons.set(ButtonFlag::DPadUp, true);
        frame.motion = Some(MotionSample {
            accelerometer: Vec3::new(0.0, 1.0, 0.0),
            gyroscope: Vec3::new(1.0, 2.0, 3.0),
            timestamp_us: 777,
        });
        left.push_frame(frame);

        let mut right = MockController::new(DeviceFamily::XInput);
        let mut frame = ControllerFrame::default();
        frame.buttons.set(ButtonFlag::B1, true);
        frame.axes.set(AxisFlag::RightStickX, -2_000);
        right.push_frame(frame);

        let mut gone = MockController::new(DeviceFamily::DirectInput);
        let mut frame = ControllerFrame::default();
        frame.buttons.set(ButtonFlag::Special, true);
        gone.push_frame(frame);
        gone.set_connected(false);

        let controllers: Arc<Mutex<Vec<Box<dyn Controller>>>> = Arc::new(Mutex::new(vec![
            Box::new(left),
            Box::new(right),
            Box::new(gone),
        ]));

        let merged = RelayManager::poll_once(&controllers);
        assert!(merged.buttons.get(ButtonFlag::DPadUp));
        assert!(merged.buttons.get(ButtonFlag::B1));
        assert_eq!(merged.axes.get(AxisFlag::RightStickX), -2_000);
        assert_eq!(merged.motion_timestamp, 777);
        // the disconnected controller contributed nothing
        assert!(!merged.buttons.get(ButtonFlag::Special));
    }
}
