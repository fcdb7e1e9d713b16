// SPDX-License-Identifier: GPL-3.0-only
//! Terminal surface around the engine: raw-mode keyboard capture mapped to
//! intents, and an in-place renderer driven by state snapshots.

pub mod input;
pub mod view;

use std::io;

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Raw-mode and hidden-cursor guard.
///
/// Restores the terminal on drop, so a panic anywhere in the run loop still
/// leaves the shell usable.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn acquire() -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), Hide)?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show);
        let _ = disable_raw_mode();
    }
}
