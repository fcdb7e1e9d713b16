// SPDX-License-Identifier: GPL-3.0-only
//! Runtime tunables, read once at startup.
//!
//! Nothing is persisted. Every knob has a default and a `DDCDIM_*`
//! environment override; invalid values keep the default and log a warning.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Tunables {
    /// How long a display must stay quiet after the last keypress before its
    /// pending value is committed to hardware.
    pub quiet_interval: Duration,
    /// Upper bound on waiting for one setvcp call. The subprocess is not
    /// killed when this elapses; its eventual result is discarded.
    pub command_timeout: Duration,
    /// Upper bound on `ddcutil detect` at startup.
    pub detect_timeout: Duration,
    /// Upper bound on one `ddcutil getvcp` during the initial scan.
    pub read_timeout: Duration,
    /// Brightness change per keypress, in percent.
    pub initial_step: u8,
    pub step_min: u8,
    pub step_max: u8,
}

impl Default for Tunables {
    fn default() -> Self {
        Tunables {
            quiet_interval: Duration::from_millis(200),
            command_timeout: Duration::from_millis(4000),
            detect_timeout: Duration::from_millis(5000),
            read_timeout: Duration::from_millis(2000),
            initial_step: 5,
            step_min: 1,
            step_max: 25,
        }
    }
}

impl Tunables {
    pub fn from_env() -> Self {
        let d = Tunables::default();
        Tunables {
            quiet_interval: env_ms("DDCDIM_QUIET_MS", d.quiet_interval, 50, 2_000),
            command_timeout: env_ms("DDCDIM_COMMAND_TIMEOUT_MS", d.command_timeout, 500, 30_000),
            detect_timeout: env_ms("DDCDIM_DETECT_TIMEOUT_MS", d.detect_timeout, 500, 60_000),
            read_timeout: env_ms("DDCDIM_READ_TIMEOUT_MS", d.read_timeout, 200, 30_000),
            initial_step: env_u8("DDCDIM_STEP", d.initial_step),
            step_min: env_u8("DDCDIM_STEP_MIN", d.step_min),
            step_max: env_u8("DDCDIM_STEP_MAX", d.step_max),
        }
        .normalised()
    }

    /// Repair inconsistent step bounds and clamp the initial step into them.
    fn normalised(mut self) -> Self {
        let d = Tunables::default();
        if self.step_min == 0 {
            self.step_min = d.step_min;
        }
        if self.step_max < self.step_min {
            warn!(
                "step bounds inverted ({}..{}), using defaults",
                self.step_min, self.step_max
            );
            self.step_min = d.step_min;
            self.step_max = d.step_max;
        }
        self.initial_step = self.initial_step.clamp(self.step_min, self.step_max);
        self
    }
}

fn env_ms(name: &str, default: Duration, min: u64, max: u64) -> Duration {
    let Ok(raw) = std::env::var(name) else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) if (min..=max).contains(&ms) => Duration::from_millis(ms),
        Ok(ms) => {
            warn!("{name}={ms} is outside {min}..={max}, using {default:?}");
            default
        }
        Err(_) => {
            warn!("{name}={raw:?} is not a number, using {default:?}");
            default
        }
    }
}

fn env_u8(name: &str, default: u8) -> u8 {
    let Ok(raw) = std::env::var(name) else {
        return default;
    };
    match raw.trim().parse::<u8>() {
        Ok(v) => v,
        Err(_) => {
            warn!("{name}={raw:?} is not a number in 0..=255, using {default}");
            default
        }
    }
}
