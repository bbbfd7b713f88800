//! Fixed-size container for canonical axis state
//!
//! Same addressing discipline as `ButtonState`: one signed 16-bit slot per
//! `AxisFlag` ordinal, default 0.

use crate::inputs::flags::AxisFlag;

/// Current value of every canonical axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisState {
    values: [i16; AxisFlag::COUNT],
}

impl Default for AxisState {
    fn default() -> Self {
        Self {
            values: [0; AxisFlag::COUNT],
        }
    }
}

impl AxisState {
    /// Create an all-centered state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an axis. Out-of-range ordinals read as 0.
    pub fn get(&self, flag: AxisFlag) -> i16 {
        self.values.get(flag as usize).copied().unwrap_or(0)
    }

    /// Write an axis. Out-of-range ordinals are a no-op.
    pub fn set(&mut self, flag: AxisFlag, value: i16) {
        if let Some(slot) = self.values.get_mut(flag as usize) {
            *slot = value;
        }
    }

    /// Iterate over the axes currently away from rest, in ordinal order.
    pub fn active(&self) -> impl Iterator<Item = AxisFlag> + '_ {
        AxisFlag::ALL
            .iter()
            .copied()
            .filter(move |flag| self.values[*flag as usize] != 0)
    }

    /// True when every axis is at rest.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| *v == 0)
    }

    /// Every non-zero slot of `other` holds the same value here.
    /// False when either side is entirely at rest.
    pub fn contains_true(&self, other: &AxisState) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(mine, theirs)| *theirs == 0 || mine == theirs)
    }

    /// In-place merge: every non-zero slot of `other` overwrites this one.
    pub fn merge(&mut self, other: &AxisState) {
        for (mine, theirs) in self.values.iter_mut().zip(other.values.iter()) {
            if *theirs != 0 {
                *mine = *theirs;
            }
        }
    }

    /// Re-center everything.
    pub fn clear(&mut self) {
        self.values = [0; AxisFlag::COUNT];
    }
}
