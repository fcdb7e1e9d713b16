// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::config::Tunables;
use crate::ddc::{BrightnessGateway, DisplayNumber};
use crate::error::InvalidSelection;

use super::debounce::Debouncer;
use super::dispatch::Dispatcher;
use super::display::{DisplayState, Snapshot};
use super::intent::{EngineEvent, Intent};
use super::selection::Selection;
use super::step::StepSize;

/// Owns every piece of mutable brightness state.
///
/// Runs as a single task; intents and internal completions all pass through
/// its event loop, so no field needs a lock. Timers and writes run as their
/// own tasks and report back over the event channel.
#[derive(Debug)]
pub struct Engine {
    pub(super) displays: Vec<DisplayState>,
    pub(super) selection: Selection,
    pub(super) step: StepSize,
    pub(super) debouncer: Debouncer,
    pub(super) dispatcher: Dispatcher,
    pub(super) intents: mpsc::UnboundedReceiver<Intent>,
    pub(super) events: mpsc::UnboundedReceiver<EngineEvent>,
    pub(super) snapshots: watch::Sender<Snapshot>,
}

impl Engine {
    /// Build an engine over the displays found at startup.
    ///
    /// Returns the engine together with the intent sender for the input
    /// layer and the snapshot receiver for the renderer.
    pub fn new(
        tunables: &Tunables,
        gateway: Arc<dyn BrightnessGateway>,
        initial: Vec<(DisplayNumber, u8)>,
    ) -> (
        Self,
        mpsc::UnboundedSender<Intent>,
        watch::Receiver<Snapshot>,
    ) {
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut displays: Vec<DisplayState> = initial
            .into_iter()
            .map(|(number, brightness)| DisplayState::new(number, brightness))
            .collect();
        displays.sort_unstable_by_key(|d| d.number);

        let selection = Selection::default();
        let step = StepSize::new(tunables.initial_step, tunables.step_min, tunables.step_max);
        let debouncer = Debouncer::new(tunables.quiet_interval, event_tx.clone());
        let dispatcher = Dispatcher::new(gateway, event_tx, tunables.command_timeout);

        let initial_snapshot = Snapshot {
            displays: displays
                .iter()
                .map(|d| d.snapshot(selection.includes(d.number)))
                .collect(),
            selection,
            step: step.get(),
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial_snapshot);

        let engine = Engine {
            displays,
            selection,
            step,
            debouncer,
            dispatcher,
            intents: intent_rx,
            events: event_rx,
            snapshots: snapshot_tx,
        };
        (engine, intent_tx, snapshot_rx)
    }

    pub(super) fn knows(&self, number: DisplayNumber) -> bool {
        self.displays.iter().any(|d| d.number == number)
    }

    pub(super) fn display_mut(&mut self, number: DisplayNumber) -> Option<&mut DisplayState> {
        self.displays.iter_mut().find(|d| d.number == number)
    }

    /// Displays the next brightness intent touches, in registry order.
    pub(super) fn target_numbers(&self) -> Vec<DisplayNumber> {
        self.displays
            .iter()
            .map(|d| d.number)
            .filter(|n| self.selection.includes(*n))
            .collect()
    }

    /// Change the selection, rejecting numbers the registry does not know.
    pub(super) fn select(&mut self, target: Selection) -> Result<(), InvalidSelection> {
        if let Selection::SingleDisplay(number) = target {
            if !self.knows(number) {
                return Err(InvalidSelection(number));
            }
        }
        self.selection = target;
        Ok(())
    }

    pub(super) fn snapshot(&self) -> Snapshot {
        Snapshot {
            displays: self
                .displays
                .iter()
                .map(|d| d.snapshot(self.selection.includes(d.number)))
                .collect(),
            selection: self.selection,
            step: self.step.get(),
        }
    }

    /// Push the current state to the renderer. Never blocks.
    pub(super) fn publish(&self) {
        let _ = self.snapshots.send(self.snapshot());
    }
}
