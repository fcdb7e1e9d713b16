// SPDX-License-Identifier: GPL-3.0-only
//! ddcutil subprocess driver
//!
//! Shells out to `ddcutil` for detection, reads, and writes. Calls block on
//! the child process; the async side is responsible for bounding the wait.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::process::{Command, Output, Stdio};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CommandError, EnumerationError};

use super::{BrightnessGateway, DisplayNumber};

/// VCP feature code for luminance.
const VCP_BRIGHTNESS: &str = "0x10";

static RE_DISPLAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Display\s+(\d+)").unwrap());
static RE_CURRENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"current value =\s*(\d+)").unwrap());
static RE_MAX: Lazy<Regex> = Lazy::new(|| Regex::new(r"max value =\s*(\d+)").unwrap());

/// stderr fragments that mean the display itself went away or stopped
/// answering, as opposed to ddcutil misbehaving.
const UNREACHABLE_MARKERS: [&str; 4] = [
    "display not found",
    "no monitor detected",
    "ddc communication failed",
    "invalid display",
];

#[derive(Debug, Default)]
pub struct DdcutilGateway {
    /// Raw `max value` per display from the initial getvcp. Writes scale
    /// against it; 100 is assumed for displays whose read never succeeded.
    max_values: Mutex<HashMap<DisplayNumber, u16>>,
}

impl DdcutilGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(args: &[&str]) -> std::io::Result<Output> {
        Command::new("ddcutil")
            .args(args)
            .stdin(Stdio::null())
            .output()
    }

    fn max_for(&self, display: DisplayNumber) -> u16 {
        self.max_values
            .lock()
            .map(|m| m.get(&display).copied())
            .unwrap_or(None)
            .unwrap_or(100)
    }

    fn remember_max(&self, display: DisplayNumber, max: u16) {
        if let Ok(mut m) = self.max_values.lock() {
            m.insert(display, max);
        }
    }
}

impl BrightnessGateway for DdcutilGateway {
    fn detect(&self) -> Result<Vec<DisplayNumber>, EnumerationError> {
        let out = Self::run(&["detect"]).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                EnumerationError::ToolMissing
            } else {
                EnumerationError::Io(err)
            }
        })?;

        // ddcutil detect exits non-zero when nothing answers; stdout is
        // still authoritative, so parse it regardless of the status.
        let stdout = String::from_utf8_lossy(&out.stdout);
        let numbers = parse_detect(&stdout);
        if numbers.is_empty() {
            return Err(EnumerationError::NoDisplays);
        }
        debug!("ddcutil detect found displays {:?}", numbers);
        Ok(numbers)
    }

    fn read_brightness(&self, display: DisplayNumber) -> Result<u8, CommandError> {
        let out = Self::run(&["getvcp", VCP_BRIGHTNESS, "-d", &display.to_string()])
            .map_err(|err| CommandError::Protocol(err.to_string()))?;
        if !out.status.success() {
            return Err(classify_failure(&out));
        }

        let stdout = String::from_utf8_lossy(&out.stdout);
        match parse_getvcp(&stdout) {
            Some((current, max)) => {
                self.remember_max(display, max);
                Ok(to_percent(current, max))
            }
            None => Err(CommandError::Protocol(format!(
                "unexpected getvcp output: {}",
                stdout.trim()
            ))),
        }
    }

    fn set_brightness(&self, display: DisplayNumber, percent: u8) -> Result<(), CommandError> {
        debug_assert!(percent <= 100);
        let raw = from_percent(percent, self.max_for(display));
        let out = Self::run(&[
            "setvcp",
            VCP_BRIGHTNESS,
            &raw.to_string(),
            "-d",
            &display.to_string(),
        ])
        .map_err(|err| CommandError::Protocol(err.to_string()))?;
        if !out.status.success() {
            return Err(classify_failure(&out));
        }
        Ok(())
    }
}

/// Display numbers from `ddcutil detect` output. "Invalid display" and
/// "Phantom display" blocks carry no number and are skipped naturally.
fn parse_detect(stdout: &str) -> Vec<DisplayNumber> {
    let mut numbers: Vec<DisplayNumber> = RE_DISPLAY
        .captures_iter(stdout)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

/// (current, max) from `ddcutil getvcp 0x10` output.
fn parse_getvcp(stdout: &str) -> Option<(u16, u16)> {
    let current = RE_CURRENT.captures(stdout)?[1].parse().ok()?;
    let max: u16 = RE_MAX.captures(stdout)?[1].parse().ok()?;
    if max == 0 {
        return None;
    }
    Some((current, max))
}

fn to_percent(current: u16, max: u16) -> u8 {
    let percent = (u32::from(current) * 100 + u32::from(max) / 2) / u32::from(max);
    percent.min(100) as u8
}

fn from_percent(percent: u8, max: u16) -> u16 {
    let raw = (u32::from(percent) * u32::from(max) + 50) / 100;
    raw.min(u32::from(max)) as u16
}

fn classify_failure(out: &Output) -> CommandError {
    let stderr = String::from_utf8_lossy(&out.stderr);
    let lowered = stderr.to_ascii_lowercase();
    if UNREACHABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return CommandError::DeviceUnreachable;
    }

    match stderr.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => CommandError::Protocol(line.trim().to_string()),
        None => CommandError::Protocol(format!("ddcutil exited with {}", out.status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETECT_OUTPUT: &str = "\
Display 1
   I2C bus:  /dev/i2c-4
   EDID synopsis:
      Mfg id:               DEL
      Model:                DELL U2720Q
   VCP version:         2.1

Display 2
   I2C bus:  /dev/i2c-6
   EDID synopsis:
      Mfg id:               GSM
      Model:                LG HDR 4K
   VCP version:         2.1

Invalid display
   I2C bus:  /dev/i2c-7
   DDC communication failed
";

    #[test]
    fn test_parse_detect_finds_numbered_displays() {
        assert_eq!(parse_detect(DETECT_OUTPUT), vec![1, 2]);
    }

    #[test]
    fn test_parse_detect_empty_output() {
        assert!(parse_detect("No displays found\n").is_empty());
    }

    #[test]
    fn test_parse_getvcp_brightness_line() {
        let out = "VCP code 0x10 (Brightness): current value =    67, max value =   100\n";
        assert_eq!(parse_getvcp(out), Some((67, 100)));
    }

    #[test]
    fn test_parse_getvcp_rejects_garbage() {
        assert_eq!(parse_getvcp("Unable to read feature 0x10\n"), None);
        assert_eq!(
            parse_getvcp("current value = 10, max value = 0\n"),
            None,
            "zero max would divide by zero downstream"
        );
    }

    #[test]
    fn test_percent_scaling() {
        assert_eq!(to_percent(50, 100), 50);
        assert_eq!(to_percent(127, 255), 50);
        assert_eq!(to_percent(255, 255), 100);
        assert_eq!(from_percent(50, 255), 128);
        assert_eq!(from_percent(100, 255), 255);
        assert_eq!(from_percent(0, 255), 0);
        // identity when the display already speaks percent
        for p in [0u8, 1, 33, 99, 100] {
            assert_eq!(from_percent(p, 100), u16::from(p));
            assert_eq!(to_percent(u16::from(p), 100), p);
        }
    }

    fn output_with_stderr(stderr: &str) -> Output {
        use std::os::unix::process::ExitStatusExt;
        Output {
            status: std::process::ExitStatus::from_raw(1 << 8),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_classify_unreachable_display() {
        for msg in [
            "Display not found\n",
            "ddcutil: No monitor detected on bus /dev/i2c-4\n",
            "DDC communication failed (getvcp)\n",
            "Invalid display index\n",
        ] {
            assert_eq!(
                classify_failure(&output_with_stderr(msg)),
                CommandError::DeviceUnreachable,
                "stderr: {msg:?}"
            );
        }
    }

    #[test]
    fn test_classify_other_failures_as_protocol() {
        let err = classify_failure(&output_with_stderr("Unparseable EDID\n"));
        assert_eq!(err, CommandError::Protocol("Unparseable EDID".to_string()));

        let err = classify_failure(&output_with_stderr(""));
        assert!(matches!(err, CommandError::Protocol(_)));
    }
}
