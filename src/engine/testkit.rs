// SPDX-License-Identifier: GPL-3.0-only
//! Scripted gateway for exercising the dispatch and engine machinery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ddc::{BrightnessGateway, DisplayNumber};
use crate::error::{CommandError, EnumerationError};

/// One recorded write, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteCall {
    pub display: DisplayNumber,
    pub percent: u8,
}

#[derive(Debug, Default)]
struct Inner {
    displays: Vec<(DisplayNumber, u8)>,
    fail_with: HashMap<DisplayNumber, CommandError>,
    writes: Vec<WriteCall>,
    outstanding: HashMap<DisplayNumber, usize>,
    max_outstanding: usize,
}

/// In-memory gateway with scriptable failures and write latency.
///
/// Tracks the peak number of concurrent writes per display so tests can
/// assert the single-flight invariant.
#[derive(Debug, Clone)]
pub struct FakeGateway {
    write_delay: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl FakeGateway {
    pub fn new(displays: &[(DisplayNumber, u8)]) -> Self {
        FakeGateway {
            write_delay: Duration::ZERO,
            inner: Arc::new(Mutex::new(Inner {
                displays: displays.to_vec(),
                ..Inner::default()
            })),
        }
    }

    /// Make every write block for `delay` before completing.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Seed pairs in the shape `Engine::new` takes.
    pub fn displays(&self) -> Vec<(DisplayNumber, u8)> {
        self.lock().displays.clone()
    }

    /// Script all future writes to `display` to fail with `error`.
    pub fn fail_display(&self, display: DisplayNumber, error: CommandError) {
        self.lock().fail_with.insert(display, error);
    }

    pub fn clear_failure(&self, display: DisplayNumber) {
        self.lock().fail_with.remove(&display);
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.lock().writes.clone()
    }

    pub fn writes_to(&self, display: DisplayNumber) -> Vec<u8> {
        self.lock()
            .writes
            .iter()
            .filter(|w| w.display == display)
            .map(|w| w.percent)
            .collect()
    }

    /// Peak concurrent writes observed for any single display.
    pub fn max_concurrent_writes_per_display(&self) -> usize {
        self.lock().max_outstanding
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake gateway poisoned")
    }
}

impl BrightnessGateway for FakeGateway {
    fn detect(&self) -> Result<Vec<DisplayNumber>, EnumerationError> {
        let numbers: Vec<DisplayNumber> =
            self.lock().displays.iter().map(|(n, _)| *n).collect();
        if numbers.is_empty() {
            return Err(EnumerationError::NoDisplays);
        }
        Ok(numbers)
    }

    fn read_brightness(&self, display: DisplayNumber) -> Result<u8, CommandError> {
        self.lock()
            .displays
            .iter()
            .find(|(n, _)| *n == display)
            .map(|(_, b)| *b)
            .ok_or(CommandError::DeviceUnreachable)
    }

    fn set_brightness(&self, display: DisplayNumber, percent: u8) -> Result<(), CommandError> {
        {
            let mut inner = self.lock();
            let n = inner.outstanding.entry(display).or_insert(0);
            *n += 1;
            let peak = *n;
            inner.max_outstanding = inner.max_outstanding.max(peak);
        }

        if !self.write_delay.is_zero() {
            std::thread::sleep(self.write_delay);
        }

        let mut inner = self.lock();
        if let Some(n) = inner.outstanding.get_mut(&display) {
            *n -= 1;
        }
        inner.writes.push(WriteCall { display, percent });
        match inner.fail_with.get(&display) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
