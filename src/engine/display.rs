// SPDX-License-Identifier: GPL-3.0-only

use crate::ddc::DisplayNumber;
use crate::error::CommandError;

use super::selection::Selection;

/// One DDC/CI display as the engine tracks it.
///
/// `confirmed` only ever changes on a hardware acknowledgement (the startup
/// read or a successful write); everything the user is still steering lives
/// in `pending`.
#[derive(Debug)]
pub struct DisplayState {
    pub number: DisplayNumber,
    /// Last brightness the hardware confirmed.
    pub confirmed: u8,
    /// Where the user is heading; Some while a quiet window is open or a
    /// write is outstanding.
    pub pending: Option<u8>,
    /// Value currently on the wire, if a write is outstanding.
    pub in_flight: Option<u8>,
    /// Failure of the most recent write, cleared by the next adjustment.
    pub last_error: Option<CommandError>,
}

impl DisplayState {
    pub fn new(number: DisplayNumber, brightness: u8) -> Self {
        debug_assert!(brightness <= 100);
        DisplayState {
            number,
            confirmed: brightness,
            pending: None,
            in_flight: None,
            last_error: None,
        }
    }

    /// Base for the next relative adjustment: the newest intention wins.
    pub fn adjust_base(&self) -> u8 {
        self.pending
            .or(self.in_flight)
            .unwrap_or(self.confirmed)
    }

    pub fn snapshot(&self, selected: bool) -> DisplaySnapshot {
        DisplaySnapshot {
            number: self.number,
            selected,
            confirmed: self.confirmed,
            pending: self.pending,
            in_flight: self.in_flight.is_some(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Read-only copy of one display's state for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySnapshot {
    pub number: DisplayNumber,
    pub selected: bool,
    pub confirmed: u8,
    pub pending: Option<u8>,
    pub in_flight: bool,
    pub last_error: Option<CommandError>,
}

impl DisplaySnapshot {
    /// What the bar should show right now.
    pub fn shown(&self) -> u8 {
        self.pending.unwrap_or(self.confirmed)
    }

    /// Whether the shown value is still waiting to be acknowledged.
    pub fn unsettled(&self) -> bool {
        self.pending.is_some() || self.in_flight
    }
}

/// Read-only copy of the whole engine state, published after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub displays: Vec<DisplaySnapshot>,
    pub selection: Selection,
    pub step: u8,
}
