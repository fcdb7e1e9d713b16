// SPDX-License-Identifier: GPL-3.0-only
//! Hardware command gateway
//!
//! The engine never talks I2C itself; every brightness read and write goes
//! through this seam so the concurrency machinery can be exercised against a
//! scripted gateway in tests.

pub mod ddcutil;

pub use ddcutil::DdcutilGateway;

use crate::error::{CommandError, EnumerationError};

/// Display handle as understood by the external utility (`ddcutil -d N`).
pub type DisplayNumber = u8;

/// Blocking brightness operations, run on the blocking pool by callers.
pub trait BrightnessGateway: std::fmt::Debug + Send + Sync {
    /// List the display numbers the external utility can address.
    fn detect(&self) -> Result<Vec<DisplayNumber>, EnumerationError>;

    /// Read the current brightness (0-100) of one display.
    fn read_brightness(&self, display: DisplayNumber) -> Result<u8, CommandError>;

    /// Set the brightness (0-100) of one display.
    fn set_brightness(&self, display: DisplayNumber, percent: u8) -> Result<(), CommandError>;
}
