//! Fixed-size container for canonical button state
//!
//! One boolean slot per `ButtonFlag` ordinal, addressed in O(1). No dynamic
//! lookup structures; the mapping and injection layers mutate this directly
//! every frame.

use crate::inputs::flags::ButtonFlag;

/// Current value of every canonical button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    values: [bool; ButtonFlag::COUNT],
}

impl Default for ButtonState {
    fn default() -> Self {
        Self {
            values: [false; ButtonFlag::COUNT],
        }
    }
}

impl ButtonState {
    /// Create an all-released state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a button. Out-of-range ordinals read as released.
    pub fn get(&self, flag: ButtonFlag) -> bool {
        self.values.get(flag as usize).copied().unwrap_or(false)
    }

    /// Write a button. Out-of-range ordinals are a no-op.
    pub fn set(&mut self, flag: ButtonFlag, pressed: bool) {
        if let Some(slot) = self.values.get_mut(flag as usize) {
            *slot = pressed;
        }
    }

    /// Iterate over the currently pressed flags, in ordinal order.
    pub fn pressed(&self) -> impl Iterator<Item = ButtonFlag> + '_ {
        ButtonFlag::ALL
            .iter()
            .copied()
            .filter(move |flag| self.values[*flag as usize])
    }

    /// True when no button is pressed.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| !v)
    }

    /// Chord test: every button pressed in `other` is also pressed here.
    /// False when either side is entirely empty.
    pub fn contains_true(&self, other: &ButtonState) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(mine, theirs)| !theirs || *mine)
    }

    /// In-place union: every button pressed in `other` becomes pressed here.
    /// Used to merge physical input with injected input.
    pub fn merge(&mut self, other: &ButtonState) {
        for (mine, theirs) in self.values.iter_mut().zip(other.values.iter()) {
            *mine |= theirs;
        }
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.values = [false; ButtonFlag::COUNT];
    }
}
