//! Canonical button and axis identifiers
//!
//! Every physical controller is translated into these flags. Both enums are
//! closed and dense (ordinals 0..COUNT) so state containers can be plain
//! fixed-size arrays. Append new variants at the end only; existing ordinals
//! are stable across versions.

use serde::{Deserialize, Serialize};

/// Canonical digital inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ButtonFlag {
    // D-pad
    DPadUp = 0,
    DPadDown,
    DPadLeft,
    DPadRight,

    // Menu cluster
    Start,
    Back,
    /// Guide / PS / home button
    Special,

    // Face buttons (B1 = south, B2 = east, B3 = west, B4 = north)
    B1,
    B2,
    B3,
    B4,

    // Shoulders and trigger-past-threshold flags
    L1,
    R1,
    L2,
    R2,

    // Stick clicks
    LeftStickClick,
    RightStickClick,

    // Touchpad touch/click (Steam Deck style split pads)
    LeftPadTouch,
    LeftPadClick,
    RightPadTouch,
    RightPadClick,

    // Vendor-specific OEM buttons
    Oem1,
    Oem2,
    Oem3,
    Oem4,
    Oem5,
    Oem6,

    // Reserved hotkey slots for the remapping layer
    Hotkey1,
    Hotkey2,
    Hotkey3,
    Hotkey4,
}

impl ButtonFlag {
    /// Number of canonical buttons; sizes every `ButtonState`.
    pub const COUNT: usize = 31;

    /// All flags in ordinal order.
    pub const ALL: [ButtonFlag; Self::COUNT] = [
        ButtonFlag::DPadUp,
        ButtonFlag::DPadDown,
        ButtonFlag::DPadLeft,
        ButtonFlag::DPadRight,
        ButtonFlag::Start,
        ButtonFlag::Back,
        ButtonFlag::Special,
        ButtonFlag::B1,
        ButtonFlag::B2,
        ButtonFlag::B3,
        ButtonFlag::B4,
        ButtonFlag::L1,
        ButtonFlag::R1,
        ButtonFlag::L2,
        ButtonFlag::R2,
        ButtonFlag::LeftStickClick,
        ButtonFlag::RightStickClick,
        ButtonFlag::LeftPadTouch,
        ButtonFlag::LeftPadClick,
        ButtonFlag::RightPadTouch,
        ButtonFlag::RightPadClick,
        ButtonFlag::Oem1,
        ButtonFlag::Oem2,
        ButtonFlag::Oem3,
        ButtonFlag::Oem4,
        ButtonFlag::Oem5,
        ButtonFlag::Oem6,
        ButtonFlag::Hotkey1,
        ButtonFlag::Hotkey2,
        ButtonFlag::Hotkey3,
        ButtonFlag::Hotkey4,
    ];
}

/// Canonical analog inputs.
///
/// Stick axes use the full i16 range. Trigger pulls (`L2`/`R2`) are 0..=255.
/// Pad axes carry u16 touch coordinates in i16 space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AxisFlag {
    LeftStickX = 0,
    LeftStickY,
    RightStickX,
    RightStickY,

    /// Left trigger pull, 0..=255
    L2,
    /// Right trigger pull, 0..=255
    R2,

    LeftPadX,
    LeftPadY,
    RightPadX,
    RightPadY,

    // Gyro-derived virtual axes
    GyroX,
    GyroY,
}

impl AxisFlag {
    /// Number of canonical axes; sizes every `AxisState`.
    pub const COUNT: usize = 12;

    /// All flags in ordinal order.
    pub const ALL: [AxisFlag; Self::COUNT] = [
        AxisFlag::LeftStickX,
        AxisFlag::LeftStickY,
        AxisFlag::RightStickX,
        AxisFlag::RightStickY,
        AxisFlag::L2,
        AxisFlag::R2,
        AxisFlag::LeftPadX,
        AxisFlag::LeftPadY,
        AxisFlag::RightPadX,
        AxisFlag::RightPadY,
        AxisFlag::GyroX,
        AxisFlag::GyroY,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_ordinals_are_dense() {
        for (i, flag) in ButtonFlag::ALL.iter().enumerate() {
            assert_eq!(*flag as usize, i);
        }
        assert_eq!(ButtonFlag::ALL.len(), ButtonFlag::COUNT);
    }

    #[test]
    fn axis_ordinals_are_dense() {
        for (i, flag) in AxisFlag::ALL.iter().enumerate() {
            assert_eq!(*flag as usize, i);
        }
        assert_eq!(AxisFlag::ALL.len(), AxisFlag::COUNT);
    }
}
