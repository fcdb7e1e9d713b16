// SPDX-License-Identifier: GPL-3.0-only
//! Debounced multi-display brightness engine
//!
//! One task owns all brightness state and consumes intents from the input
//! layer. Rapid adjustments coalesce per display behind a quiet window;
//! once a display stays quiet the final value goes to hardware with at most
//! one write outstanding per display. Every state change is published as a
//! [`Snapshot`] for the renderer.

mod debounce;
mod dispatch;
mod display;
mod intent;
mod selection;
mod state;
mod step;
mod update;

#[cfg(test)]
pub mod testkit;

pub use display::{DisplaySnapshot, Snapshot};
pub use intent::Intent;
pub use selection::Selection;
pub use state::Engine;
