//! DSU pad metadata and client bookkeeping types

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::dsu::constants::NUM_SLOTS;
use crate::power::PowerStatus;

/// Reported connection state of a pad slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DsState {
    Disconnected = 0x00,
    Reserved = 0x01,
    Connected = 0x02,
}

/// Reported transport of a pad slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DsConnection {
    None = 0x00,
    Usb = 0x01,
    Bluetooth = 0x02,
}

/// Reported pad model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DsModel {
    None = 0,
    Ds3 = 1,
    Ds4 = 2,
    Generic = 3,
}

/// Battery tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DsBattery {
    None = 0x00,
    Dying = 0x01,
    Low = 0x02,
    Medium = 0x03,
    High = 0x04,
    Full = 0x05,
    Charging = 0xEE,
    Charged = 0xEF,
}

impl From<PowerStatus> for DsBattery {
    fn from(status: PowerStatus) -> Self {
        match status {
            PowerStatus::Charging => DsBattery::Charging,
            PowerStatus::NoBattery => DsBattery::None,
            PowerStatus::High => DsBattery::High,
            PowerStatus::Low => DsBattery::Low,
            PowerStatus::Critical => DsBattery::Dying,
            PowerStatus::Other => DsBattery::Medium,
        }
    }
}

/// 6-byte hardware-style pad address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Synthetic address for a virtual pad slot: every byte is 0x10 + slot.
    pub fn for_slot(slot: u8) -> Self {
        MacAddress([0x10 + slot; 6])
    }

    pub fn bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Per-slot pad identity reported over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualShockPadMeta {
    pub pad_id: u8,
    pub pad_state: DsState,
    pub connection_type: DsConnection,
    pub model: DsModel,
    pub pad_mac_address: MacAddress,
    pub battery_status: DsBattery,
    pub is_active: bool,
}

impl DualShockPadMeta {
    /// Slot identity held for the server's lifetime.
    pub fn for_slot(slot: u8) -> Self {
        Self {
            pad_id: slot,
            pad_state: DsState::Connected,
            connection_type: DsConnection::Usb,
            model: DsModel::Ds4,
            pad_mac_address: MacAddress::for_slot(slot),
            battery_status: DsBattery::Full,
            is_active: true,
        }
    }
}

/// Subscription flags carried by a PadDataReq.
pub const REG_FLAG_PAD_ID: u8 = 0x01;
pub const REG_FLAG_PAD_MAC: u8 = 0x02;

/// Freshness bookkeeping for one remote endpoint.
///
/// Each subscription scope (all pads, per slot id, per pad address) tracks
/// its own last-request time; a scope is live while its stamp is younger than
/// the timeout window.
#[derive(Debug, Clone, Default)]
pub struct ClientRequestTimes {
    all_pads: Option<Instant>,
    pad_ids: [Option<Instant>; NUM_SLOTS],
    pad_macs: HashMap<MacAddress, Instant>,
}

impl ClientRequestTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp whichever scope the request's flags byte selects.
    pub fn request_pad_info(&mut self, reg_flags: u8, pad_id: u8, mac: MacAddress, now: Instant) {
        if reg_flags == 0 {
            self.all_pads = Some(now);
            return;
        }
        if reg_flags & REG_FLAG_PAD_ID != 0 {
            if let Some(slot) = self.pad_ids.get_mut(pad_id as usize) {
                *slot = Some(now);
            }
        }
        if reg_flags & REG_FLAG_PAD_MAC != 0 {
            self.pad_macs.insert(mac, now);
        }
    }

    fn fresh(stamp: Option<Instant>, now: Instant, timeout: Duration) -> bool {
        match stamp {
            Some(at) => now.saturating_duration_since(at) < timeout,
            None => false,
        }
    }

    /// Live for this slot through any scope: all-pads, its id, or its address.
    pub fn is_live_for(
        &self,
        pad_id: u8,
        mac: &MacAddress,
        now: Instant,
        timeout: Duration,
    ) -> bool {
        if Self::fresh(self.all_pads, now, timeout) {
            return true;
        }
        if let Some(stamp) = self.pad_ids.get(pad_id as usize) {
            if Self::fresh(*stamp, now, timeout) {
                return true;
            }
        }
        Self::fresh(self.pad_macs.get(mac).copied(), now, timeout)
    }

    /// Every scope has gone stale; the registry entry can be deleted.
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        if Self::fresh(self.all_pads, now, timeout) {
            return false;
        }
        if self
            .pad_ids
            .iter()
            .any(|stamp| Self::fresh(*stamp, now, timeout))
        {
            return false;
        }
        !self
            .pad_macs
            .values()
            .any(|at| Self::fresh(Some(*at), now, timeout))
    }
}
