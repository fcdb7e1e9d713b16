// SPDX-License-Identifier: GPL-3.0-only

use crate::ddc::DisplayNumber;

/// Which displays the next brightness intent applies to.
///
/// Validation against the registry happens in the engine; the selection
/// itself never holds a number the registry does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    AllDisplays,
    SingleDisplay(DisplayNumber),
}

impl Selection {
    pub fn includes(&self, number: DisplayNumber) -> bool {
        match self {
            Selection::AllDisplays => true,
            Selection::SingleDisplay(n) => *n == number,
        }
    }
}
