// SPDX-License-Identifier: GPL-3.0-only
//! Keyboard capture
//!
//! Reads raw-mode key events and forwards them to the engine as intents.
//! Only key presses count; repeat and release events from terminals that
//! report them are dropped so a held arrow key arrives as the terminal's
//! own repeat stream of presses.

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::engine::Intent;

/// Pump key events into the engine until a Quit intent goes out, the
/// engine goes away, or the input stream breaks.
pub async fn read_intents(intents: UnboundedSender<Intent>) {
    let mut events = EventStream::new();
    while let Some(event) = events.next().await {
        let key = match event {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
            Ok(_) => continue,
            Err(err) => {
                warn!("input stream failed: {err}");
                let _ = intents.send(Intent::Quit);
                return;
            }
        };
        let Some(intent) = intent_for(key) else {
            continue;
        };
        let quitting = intent == Intent::Quit;
        if intents.send(intent).is_err() || quitting {
            return;
        }
    }
}

/// Map one key press to its intent, if it has one.
fn intent_for(key: KeyEvent) -> Option<Intent> {
    // raw mode turns Ctrl+C into an ordinary key event
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Intent::Quit);
    }
    match key.code {
        KeyCode::Right => Some(Intent::IncreaseBrightness),
        KeyCode::Left => Some(Intent::DecreaseBrightness),
        KeyCode::Up | KeyCode::Char('+') | KeyCode::Char('=') => Some(Intent::IncreaseStep),
        KeyCode::Down | KeyCode::Char('-') | KeyCode::Char('_') => Some(Intent::DecreaseStep),
        KeyCode::Char('0') => Some(Intent::SelectAll),
        KeyCode::Char(c @ '1'..='9') => Some(Intent::SelectDisplay(c as u8 - b'0')),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Intent::Quit),
        _ => None,
    }
}
