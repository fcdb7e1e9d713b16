// SPDX-License-Identifier: GPL-3.0-only
//! Concurrent brightness writes, one per display.
//!
//! At most one setvcp is outstanding per display at any instant. A value
//! arriving while one is outstanding parks in a single superseding slot
//! (newest wins); completion either promotes the slot as one trailing write
//! or drops it. Writes to different displays overlap freely.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;

use crate::ddc::{BrightnessGateway, DisplayNumber};
use crate::error::CommandError;

use super::intent::EngineEvent;

#[derive(Debug, Default)]
struct Slot {
    in_flight: bool,
    next: Option<u8>,
}

/// What `submit` did with the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A write started now.
    Started,
    /// An earlier write is still out; the value parked in the slot.
    Parked,
}

#[derive(Debug)]
pub struct Dispatcher {
    gateway: Arc<dyn BrightnessGateway>,
    events: UnboundedSender<EngineEvent>,
    command_timeout: Duration,
    slots: HashMap<DisplayNumber, Slot>,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn BrightnessGateway>,
        events: UnboundedSender<EngineEvent>,
        command_timeout: Duration,
    ) -> Self {
        Dispatcher {
            gateway,
            events,
            command_timeout,
            slots: HashMap::new(),
        }
    }

    /// Start a write for the display, or park the value if one is out.
    pub fn submit(&mut self, display: DisplayNumber, value: u8) -> Submission {
        let slot = self.slots.entry(display).or_default();
        if slot.in_flight {
            slot.next = Some(value);
            return Submission::Parked;
        }
        slot.in_flight = true;
        self.spawn_write(display, value);
        Submission::Started
    }

    /// Drop any parked value without touching the in-flight write.
    ///
    /// Used when a newer intent settles on the value already on the wire,
    /// which makes whatever parked earlier stale.
    pub fn discard_parked(&mut self, display: DisplayNumber) {
        if let Some(slot) = self.slots.get_mut(&display) {
            slot.next = None;
        }
    }

    /// Reconcile a finished write and decide on the trailing one.
    ///
    /// `confirmed` carries the written value on success, nothing on failure.
    /// `defer` is set when a newer quiet window is already armed for the
    /// display; the slot is dropped in its favour. A parked value also drops
    /// when the write failed (a trailing write would amount to an automatic
    /// retry) or when it equals the value just confirmed. Returns the value
    /// of the trailing write, if one started.
    pub fn complete(
        &mut self,
        display: DisplayNumber,
        confirmed: Option<u8>,
        defer: bool,
    ) -> Option<u8> {
        let next = {
            let slot = self.slots.entry(display).or_default();
            slot.in_flight = false;
            slot.next.take()
        };

        let trailing = match (next, confirmed) {
            (Some(value), Some(confirmed)) if !defer && value != confirmed => Some(value),
            _ => None,
        };
        if let Some(value) = trailing {
            let slot = self.slots.entry(display).or_default();
            slot.in_flight = true;
            self.spawn_write(display, value);
        }
        trailing
    }

    fn spawn_write(&self, display: DisplayNumber, value: u8) {
        let gateway = self.gateway.clone();
        let events = self.events.clone();
        let limit = self.command_timeout;
        tokio::spawn(async move {
            let started = Instant::now();
            let call = tokio::task::spawn_blocking(move || gateway.set_brightness(display, value));
            let outcome = match tokio::time::timeout(limit, call).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => {
                    Err(CommandError::Protocol(format!("write task failed: {join_err}")))
                }
                // the subprocess is not killed; its eventual result is dropped
                Err(_) => Err(CommandError::Timeout),
            };
            // `display` would be shadowed by `tracing::field::display` inside
            // the macro expansion, so log through a differently named binding
            let display_no = display;
            match &outcome {
                Ok(()) => {
                    debug!("display {} set to {value}% in {:?}", display_no, started.elapsed())
                }
                Err(err) => warn!("display {}: set to {value}% failed: {err}", display_no),
            }
            let _ = events.send(EngineEvent::CommandFinished {
                display,
                value,
                outcome,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testkit::{FakeGateway, WriteCall};
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout};

    const SETTLE: Duration = Duration::from_millis(120);

    fn dispatcher(
        fake: &FakeGateway,
    ) -> (Dispatcher, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Dispatcher::new(Arc::new(fake.clone()), tx, Duration::from_millis(500)),
            rx,
        )
    }

    async fn next_finished(
        rx: &mut mpsc::UnboundedReceiver<EngineEvent>,
    ) -> (DisplayNumber, u8, Result<(), CommandError>) {
        let ev = timeout(Duration::from_millis(700), rx.recv())
            .await
            .expect("no completion arrived")
            .expect("channel closed");
        match ev {
            EngineEvent::CommandFinished {
                display,
                value,
                outcome,
            } => (display, value, outcome),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_submit_writes_and_reports() {
        let fake = FakeGateway::new(&[(1, 50)]);
        let (mut dispatcher, mut rx) = dispatcher(&fake);

        assert_eq!(dispatcher.submit(1, 60), Submission::Started);
        let (display, value, outcome) = next_finished(&mut rx).await;
        assert_eq!((display, value), (1, 60));
        assert!(outcome.is_ok());
        assert_eq!(fake.writes(), vec![WriteCall { display: 1, percent: 60 }]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_value_parks_and_trails() {
        let fake = FakeGateway::new(&[(1, 50)]).with_write_delay(Duration::from_millis(60));
        let (mut dispatcher, mut rx) = dispatcher(&fake);

        assert_eq!(dispatcher.submit(1, 60), Submission::Started);
        assert_eq!(dispatcher.submit(1, 70), Submission::Parked);
        assert_eq!(dispatcher.submit(1, 80), Submission::Parked);

        let (_, value, outcome) = next_finished(&mut rx).await;
        assert_eq!(value, 60);
        let trailing = dispatcher.complete(1, outcome.ok().map(|_| value), false);
        assert_eq!(trailing, Some(80), "newest parked value wins");

        let (_, value, _) = next_finished(&mut rx).await;
        assert_eq!(value, 80);
        assert_eq!(fake.writes_to(1), vec![60, 80]);
        assert_eq!(fake.max_concurrent_writes_per_display(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_parked_value_drops_on_failure() {
        let fake = FakeGateway::new(&[(1, 50)]).with_write_delay(Duration::from_millis(40));
        fake.fail_display(1, CommandError::DeviceUnreachable);
        let (mut dispatcher, mut rx) = dispatcher(&fake);

        dispatcher.submit(1, 60);
        dispatcher.submit(1, 70);
        let (_, _, outcome) = next_finished(&mut rx).await;
        assert_eq!(outcome, Err(CommandError::DeviceUnreachable));

        assert_eq!(dispatcher.complete(1, None, false), None);
        sleep(SETTLE).await;
        assert_eq!(fake.writes_to(1), vec![60], "no trailing write after a failure");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_discarded_parked_value_never_trails() {
        let fake = FakeGateway::new(&[(1, 50)]).with_write_delay(Duration::from_millis(40));
        let (mut dispatcher, mut rx) = dispatcher(&fake);

        dispatcher.submit(1, 60);
        dispatcher.submit(1, 70);
        dispatcher.discard_parked(1);
        let (_, value, _) = next_finished(&mut rx).await;
        assert_eq!(dispatcher.complete(1, Some(value), false), None);
        sleep(SETTLE).await;
        assert_eq!(fake.writes_to(1), vec![60]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_parked_value_drops_when_deferred() {
        let fake = FakeGateway::new(&[(1, 50)]).with_write_delay(Duration::from_millis(40));
        let (mut dispatcher, mut rx) = dispatcher(&fake);

        dispatcher.submit(1, 60);
        dispatcher.submit(1, 70);
        let (_, value, _) = next_finished(&mut rx).await;
        assert_eq!(dispatcher.complete(1, Some(value), true), None);
        sleep(SETTLE).await;
        assert_eq!(fake.writes_to(1), vec![60]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_parked_value_drops_when_already_confirmed() {
        let fake = FakeGateway::new(&[(1, 50)]).with_write_delay(Duration::from_millis(40));
        let (mut dispatcher, mut rx) = dispatcher(&fake);

        dispatcher.submit(1, 60);
        dispatcher.submit(1, 60);
        let (_, value, _) = next_finished(&mut rx).await;
        assert_eq!(dispatcher.complete(1, Some(value), false), None);
        sleep(SETTLE).await;
        assert_eq!(fake.writes_to(1), vec![60]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_displays_write_in_parallel() {
        let fake =
            FakeGateway::new(&[(1, 50), (2, 50)]).with_write_delay(Duration::from_millis(100));
        let (mut dispatcher, mut rx) = dispatcher(&fake);

        let started = Instant::now();
        dispatcher.submit(1, 60);
        dispatcher.submit(2, 40);
        let mut finished = Vec::new();
        for _ in 0..2 {
            let (display, ..) = next_finished(&mut rx).await;
            finished.push(display);
        }
        // both ran concurrently, so the pair finishes well under two delays
        assert!(started.elapsed() < Duration::from_millis(180));
        finished.sort_unstable();
        assert_eq!(finished, vec![1, 2]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_slow_write_times_out() {
        let fake = FakeGateway::new(&[(1, 50)]).with_write_delay(Duration::from_millis(300));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dispatcher =
            Dispatcher::new(Arc::new(fake.clone()), tx, Duration::from_millis(50));

        dispatcher.submit(1, 60);
        let (_, value, outcome) = next_finished(&mut rx).await;
        assert_eq!(value, 60);
        assert_eq!(outcome, Err(CommandError::Timeout));
    }
}
