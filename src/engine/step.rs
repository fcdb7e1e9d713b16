// SPDX-License-Identifier: GPL-3.0-only

/// Brightness change per keypress, in percent.
///
/// Adjustments saturate at the configured bounds instead of failing.
#[derive(Debug, Clone, Copy)]
pub struct StepSize {
    value: u8,
    min: u8,
    max: u8,
}

impl StepSize {
    pub fn new(value: u8, min: u8, max: u8) -> Self {
        debug_assert!(min >= 1 && min <= max);
        StepSize {
            value: value.clamp(min, max),
            min,
            max,
        }
    }

    pub fn get(&self) -> u8 {
        self.value
    }

    pub fn increase(&mut self) {
        self.value = self.value.saturating_add(1).min(self.max);
    }

    pub fn decrease(&mut self) {
        self.value = self.value.saturating_sub(1).max(self.min);
    }
}
