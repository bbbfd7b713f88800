//! Host power status
//!
//! The relay reports a battery tag per virtual pad, refreshed about once per
//! second from the host's power state. The platform query lives behind a
//! trait so tests and non-Windows builds can substitute a fixed value.

use std::sync::{Arc, Mutex};

/// Coarse host power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerStatus {
    Charging,
    NoBattery,
    High,
    Low,
    Critical,
    Other,
}

/// Source of the host power state.
pub trait PowerSource: Send + Sync {
    fn status(&self) -> PowerStatus;
}

/// Live host power query.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostPower;

impl HostPower {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl PowerSource for HostPower {
    fn status(&self) -> PowerStatus {
        use windows::Win32::System::Power::GetSystemPowerStatus;
        use windows::Win32::System::Power::SYSTEM_POWER_STATUS;

        let mut status = SYSTEM_POWER_STATUS::default();
        // SAFETY: the struct is plain-old-data and fully initialized by the call
        if unsafe { GetSystemPowerStatus(&mut status) }.is_err() {
            return PowerStatus::Other;
        }

        // BatteryFlag bits: 1 high, 2 low, 4 critical, 8 charging, 128 no battery
        let flag = status.BatteryFlag;
        if flag & 8 != 0 {
            PowerStatus::Charging
        } else if flag & 128 != 0 {
            PowerStatus::NoBattery
        } else if flag & 1 != 0 {
            PowerStatus::High
        } else if flag & 4 != 0 {
            PowerStatus::Critical
        } else if flag & 2 != 0 {
            PowerStatus::Low
        } else {
            PowerStatus::Other
        }
    }
}

#[cfg(not(windows))]
impl PowerSource for HostPower {
    fn status(&self) -> PowerStatus {
        PowerStatus::Other
    }
}

/// Settable power source for tests.
#[derive(Debug, Clone, Default)]
pub struct MockPower {
    status: Arc<Mutex<Option<PowerStatus>>>,
}

impl MockPower {
    pub fn new(status: PowerStatus) -> Self {
        Self {
            status: Arc::new(Mutex::new(Some(status))),
        }
    }

    pub fn set_status(&self, status: PowerStatus) {
        if let Ok(mut slot) = self.status.lock() {
            *slot = Some(status);
        }
    }
}

impl PowerSource for MockPower {
    fn status(&self) -> PowerStatus {
        self.status
            .lock()
            .ok()
            .and_then(|slot| *slot)
            .unwrap_or(PowerStatus::Other)
    }
}
