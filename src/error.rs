// SPDX-License-Identifier: GPL-3.0-only
//! Error types for the application
//!
//! Enumeration failures are fatal at startup; command failures are scoped to
//! one display and recorded against it, never stopping the engine.

use std::time::Duration;

use thiserror::Error;

/// Failure while discovering displays at startup
#[derive(Error, Debug)]
pub enum EnumerationError {
    /// ddcutil is not installed or not on PATH
    #[error("ddcutil was not found on PATH")]
    ToolMissing,

    /// ddcutil ran but reported no usable displays
    #[error("no DDC/CI capable displays detected")]
    NoDisplays,

    /// ddcutil detect did not finish in time
    #[error("display detection did not finish within {0:?}")]
    Timeout(Duration),

    /// Failed to spawn or talk to ddcutil
    #[error("failed to run ddcutil: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single brightness-set command
///
/// Carried in state snapshots, so it stays cheap to clone and compare.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The call outlived the configured wait bound
    #[error("timed out waiting for ddcutil")]
    Timeout,

    /// The display vanished or stopped answering on the bus
    #[error("display did not respond")]
    DeviceUnreachable,

    /// Any other ddcutil failure
    #[error("ddcutil failed: {0}")]
    Protocol(String),
}

/// Selection of a display number that is not in the registry
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no display with number {0}")]
pub struct InvalidSelection(pub u8);
