//! Motion sample tables
//!
//! Accelerometer and gyroscope vectors are tracked per sensor source so the
//! raw device reading, the fused gamepad-motion estimate and the relay-facing
//! estimate can evolve independently. Every source always has an entry.

use serde::{Deserialize, Serialize};

/// 3-component float vector (X, Y, Z).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Origin of a motion sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionSource {
    /// Unprocessed device reading
    Raw = 0,
    /// Fused gamepad-motion estimate
    Fused,
    /// Estimate shaped for the DSU relay
    Relay,
}

impl MotionSource {
    pub const COUNT: usize = 3;

    pub const ALL: [MotionSource; Self::COUNT] = [
        MotionSource::Raw,
        MotionSource::Fused,
        MotionSource::Relay,
    ];
}

/// Per-source accelerometer and gyroscope state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GyroState {
    accelerometer: [Vec3; MotionSource::COUNT],
    gyroscope: [Vec3; MotionSource::COUNT],
}

impl GyroState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accelerometer(&self, source: MotionSource) -> Vec3 {
        self.accelerometer[source as usize]
    }

    pub fn gyroscope(&self, source: MotionSource) -> Vec3 {
        self.gyroscope[source as usize]
    }

    /// Write one source's accelerometer entry.
    pub fn set_accelerometer(&mut self, source: MotionSource, value: Vec3) {
        self.accelerometer[source as usize] = value;
    }

    /// Write one source's gyroscope entry.
    pub fn set_gyroscope(&mut self, source: MotionSource, value: Vec3) {
        self.gyroscope[source as usize] = value;
    }

    /// Write every tracked source at once. Producers without a fusion stage
    /// feed all sources from the same device reading.
    pub fn update_all(&mut self, accelerometer: Vec3, gyroscope: Vec3) {
        for source in MotionSource::ALL {
            self.accelerometer[source as usize] = accelerometer;
            self.gyroscope[source as usize] = gyroscope;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_source_has_an_entry() {
        let state = GyroState::new();
        for source in MotionSource::ALL {
            assert_eq!(state.accelerometer(source), Vec3::ZERO);
            assert_eq!(state.gyroscope(source), Vec3::ZERO);
        }
    }

    #[test]
    fn update_all_writes_every_source() {
        let mut state = GyroState::new();
        let accel = Vec3::new(0.0, 1.0, 0.0);
        let gyro = Vec3::new(10.0, -5.0, 2.5);

        state.update_all(accel, gyro);
        for source in MotionSource::ALL {
            assert_eq!(state.accelerometer(source), accel);
            assert_eq!(state.gyroscope(source), gyro);
        }
    }

    #[test]
    fn targeted_write_leaves_other_sources() {
        let mut state = GyroState::new();
        state.update_all(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO);

        state.set_accelerometer(MotionSource::Relay, Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(
            state.accelerometer(MotionSource::Raw),
            Vec3::new(0.0, 1.0, 0.0)
        );
        assert_eq!(
            state.accelerometer(MotionSource::Relay),
            Vec3::new(0.5, 0.5, 0.5)
        );
    }
}
