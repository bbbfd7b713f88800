//! Controller abstraction
//!
//! Physical device families (XInput, DirectInput, proprietary HID pads) plug
//! in behind one small capability trait: poll the native report, translate it
//! into canonical state, report liveness. The relay never sees a device's
//! native report format.

pub mod mock;

pub use mock::MockController;

use crate::inputs::{AxisState, ButtonState, TouchPoint, Vec3};

/// Device family tag, used for logging and family-specific quirks downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    XInput,
    DirectInput,
    /// Steam Deck built-in pad
    Neptune,
}

/// One raw motion reading taken during a poll.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionSample {
    /// Linear acceleration in g
    pub accelerometer: Vec3,
    /// Angular velocity in deg/s
    pub gyroscope: Vec3,
    /// Sample time in microseconds
    pub timestamp_us: u64,
}

/// Canonical translation of one native report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerFrame {
    pub buttons: ButtonState,
    pub axes: AxisState,
    /// Present only for devices with motion sensors
    pub motion: Option<MotionSample>,
    /// Up to two touchpad contacts for devices with pads
    pub touch: [TouchPoint; 2],
}

/// Capability contract every device family implements.
///
/// `poll` reads the native report and returns the canonical frame, or `None`
/// while the device is disconnected or faulted; it must not repeat stale
/// state in that condition. Reconnection is observed through a live
/// `is_connected` recheck on the next cycle, never cached forever.
pub trait Controller: Send {
    fn family(&self) -> DeviceFamily;

    fn is_connected(&self) -> bool;

    fn poll(&mut self) -> Option<ControllerFrame>;
}
