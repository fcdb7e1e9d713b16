// SPDX-License-Identifier: GPL-3.0-only

use crate::ddc::DisplayNumber;
use crate::error::CommandError;

use super::dispatch::Submission;
use super::intent::{BrightnessChange, EngineEvent, Intent};
use super::selection::Selection;
use super::state::Engine;

impl Engine {
    /// Drive the engine until a Quit intent arrives or every intent sender
    /// is gone. In-flight writes are left to finish on their own; their
    /// results are discarded.
    pub async fn run(mut self) {
        self.publish();
        loop {
            tokio::select! {
                intent = self.intents.recv() => {
                    match intent {
                        Some(Intent::Quit) | None => {
                            debug!("engine stopping");
                            break;
                        }
                        Some(intent) => self.apply_intent(intent),
                    }
                }
                event = self.events.recv() => {
                    // the timer and writer sender halves live in self, so
                    // this arm stays live as long as the engine does
                    if let Some(event) = event {
                        self.handle_event(event);
                    }
                }
            }
            self.publish();
        }
    }

    fn apply_intent(&mut self, intent: Intent) {
        trace!("{:?}", intent);
        match intent {
            Intent::IncreaseBrightness => {
                self.adjust(BrightnessChange::Relative(i16::from(self.step.get())));
            }
            Intent::DecreaseBrightness => {
                self.adjust(BrightnessChange::Relative(-i16::from(self.step.get())));
            }
            Intent::IncreaseStep => self.step.increase(),
            Intent::DecreaseStep => self.step.decrease(),
            Intent::SelectAll => {
                // cannot fail
                let _ = self.select(Selection::AllDisplays);
            }
            Intent::SelectDisplay(number) => {
                if let Err(err) = self.select(Selection::SingleDisplay(number)) {
                    debug!("ignoring selection: {err}");
                }
            }
            Intent::Quit => {
                // consumed by the run loop before dispatching here
            }
        }
    }

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::DebounceFired {
                display,
                generation,
            } => self.on_quiet_window_elapsed(display, generation),
            EngineEvent::CommandFinished {
                display,
                value,
                outcome,
            } => self.on_command_finished(display, value, outcome),
        }
    }

    /// Route one brightness change to every selected display.
    fn adjust(&mut self, change: BrightnessChange) {
        for number in self.target_numbers() {
            self.record_change(number, change);
        }
    }

    /// Fold a change into one display's pending value and restart its quiet
    /// window. Returning to the confirmed value cancels the window instead
    /// of scheduling a write the hardware would not notice.
    fn record_change(&mut self, number: DisplayNumber, change: BrightnessChange) {
        let Some(display) = self.display_mut(number) else {
            return;
        };
        let target = change.apply(display.adjust_base());
        display.last_error = None;

        if display.in_flight.is_none() && target == display.confirmed {
            display.pending = None;
            self.debouncer.disarm(number);
            return;
        }
        display.pending = Some(target);
        self.debouncer.arm(number);
    }

    fn on_quiet_window_elapsed(&mut self, number: DisplayNumber, generation: u64) {
        if !self.debouncer.confirm_fire(number, generation) {
            // stale timer, a newer window owns this display
            return;
        }
        let Some(display) = self.display_mut(number) else {
            return;
        };
        let Some(target) = display.pending else {
            return;
        };

        if display.in_flight == Some(target) {
            // the same value is already on the wire; completion reconciles,
            // and anything parked earlier is now older than this target
            self.dispatcher.discard_parked(number);
            return;
        }
        if display.in_flight.is_none() && target == display.confirmed {
            display.pending = None;
            return;
        }

        if self.dispatcher.submit(number, target) == Submission::Started {
            if let Some(display) = self.display_mut(number) {
                display.in_flight = Some(target);
            }
        }
    }

    fn on_command_finished(
        &mut self,
        number: DisplayNumber,
        value: u8,
        outcome: Result<(), CommandError>,
    ) {
        let defer = self.debouncer.armed(number);
        let confirmed = if outcome.is_ok() { Some(value) } else { None };
        let trailing = self.dispatcher.complete(number, confirmed, defer);

        let Some(display) = self.display_mut(number) else {
            return;
        };
        display.in_flight = None;

        match outcome {
            Ok(()) => {
                display.confirmed = value;
                display.last_error = None;
                if let Some(next) = trailing {
                    debug_assert_eq!(display.pending, Some(next));
                    display.in_flight = Some(next);
                } else if !defer {
                    display.pending = None;
                }
                // an armed window keeps its newer pending value
            }
            Err(err) => {
                display.last_error = Some(err);
                if !defer {
                    display.pending = None;
                }
            }
        }
    }
}
