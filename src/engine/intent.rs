// SPDX-License-Identifier: GPL-3.0-only

use crate::ddc::DisplayNumber;
use crate::error::CommandError;

/// Semantic actions produced by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    IncreaseBrightness,
    DecreaseBrightness,
    IncreaseStep,
    DecreaseStep,
    SelectAll,
    SelectDisplay(DisplayNumber),
    Quit,
}

/// How an adjustment moves a display's pending brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessChange {
    /// Signed step relative to the newest intention for the display.
    Relative(i16),
    /// Jump straight to a value.
    Absolute(u8),
}

impl BrightnessChange {
    /// Apply to a base value, clamped to 0-100.
    pub fn apply(self, base: u8) -> u8 {
        match self {
            BrightnessChange::Relative(delta) => {
                (i32::from(base) + i32::from(delta)).clamp(0, 100) as u8
            }
            BrightnessChange::Absolute(value) => value.min(100),
        }
    }
}

/// Completions fed back into the engine task by its timers and writers.
#[derive(Debug)]
pub enum EngineEvent {
    /// A quiet window elapsed without further input.
    DebounceFired {
        display: DisplayNumber,
        generation: u64,
    },
    /// A brightness write finished.
    CommandFinished {
        display: DisplayNumber,
        value: u8,
        outcome: Result<(), CommandError>,
    },
}
