//! Canonical input state model
//!
//! Device-independent representation every controller is translated into:
//! fixed-size, index-addressed button and axis containers plus per-source
//! motion tables. These types hold no external resources and are cheap to
//! clone once per frame.

pub mod axis_state;
pub mod button_state;
pub mod flags;
pub mod gyro_state;

pub use axis_state::AxisState;
pub use button_state::ButtonState;
pub use flags::{AxisFlag, ButtonFlag};
pub use gyro_state::{GyroState, MotionSource, Vec3};

/// One touchpad contact point, mirrored onto the wire as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchPoint {
    pub active: bool,
    pub tracking_id: u8,
    pub x: u16,
    pub y: u16,
}

/// Complete canonical state of the virtual pad for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    pub buttons: ButtonState,
    pub axes: AxisState,
    pub gyro: GyroState,
    /// Up to two touchpad contacts (left pad first)
    pub touch: [TouchPoint; 2],
    /// Motion sample time in microseconds
    pub motion_timestamp: u64,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union-merge another frame into this one: buttons OR, non-zero axes
    /// overwrite, newer motion timestamp wins.
    pub fn merge(&mut self, other: &ControllerState) {
        self.buttons.merge(&other.buttons);
        self.axes.merge(&other.axes);
        if other.motion_timestamp > self.motion_timestamp {
            self.motion_timestamp = other.motion_timestamp;
        }
        for (mine, theirs) in self.touch.iter_mut().zip(other.touch.iter()) {
            if theirs.active {
                *mine = *theirs;
            }
        }
    }
}
