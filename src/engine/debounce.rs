// SPDX-License-Identifier: GPL-3.0-only
//! Per-display quiet-window timers.
//!
//! Every adjustment restarts the window for its display; only once the
//! display stays untouched for the whole interval does the pending value go
//! to hardware. A timer that was already queued when its window got
//! restarted may still deliver its event, so every fire carries a generation
//! that is checked against the live window before it counts.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::ddc::DisplayNumber;

use super::intent::EngineEvent;

#[derive(Debug)]
struct Window {
    generation: u64,
    timer: JoinHandle<()>,
}

#[derive(Debug)]
pub struct Debouncer {
    quiet_interval: Duration,
    events: UnboundedSender<EngineEvent>,
    generation: u64,
    windows: HashMap<DisplayNumber, Window>,
}

impl Debouncer {
    pub fn new(quiet_interval: Duration, events: UnboundedSender<EngineEvent>) -> Self {
        Debouncer {
            quiet_interval,
            events,
            generation: 0,
            windows: HashMap::new(),
        }
    }

    /// Arm or restart the window for one display.
    pub fn arm(&mut self, display: DisplayNumber) {
        self.generation += 1;
        let generation = self.generation;
        if let Some(old) = self.windows.remove(&display) {
            old.timer.abort();
        }

        let events = self.events.clone();
        let quiet = self.quiet_interval;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let _ = events.send(EngineEvent::DebounceFired {
                display,
                generation,
            });
        });
        self.windows.insert(display, Window { generation, timer });
    }

    /// Whether a window is currently armed for the display.
    pub fn armed(&self, display: DisplayNumber) -> bool {
        self.windows.contains_key(&display)
    }

    /// Check a fire against the live window. A current fire disarms the
    /// window and answers true; fires from restarted windows answer false.
    pub fn confirm_fire(&mut self, display: DisplayNumber, generation: u64) -> bool {
        match self.windows.get(&display) {
            Some(w) if w.generation == generation => {
                self.windows.remove(&display);
                true
            }
            _ => false,
        }
    }

    /// Disarm without firing.
    pub fn disarm(&mut self, display: DisplayNumber) {
        if let Some(w) = self.windows.remove(&display) {
            w.timer.abort();
        }
    }
}
