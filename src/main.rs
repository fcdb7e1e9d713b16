// SPDX-License-Identifier: GPL-3.0-only

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::config::Tunables;
use crate::ddc::{BrightnessGateway, DdcutilGateway, DisplayNumber};
use crate::engine::Engine;
use crate::error::EnumerationError;
use crate::ui::TerminalGuard;

#[macro_use]
extern crate tracing;

mod config;
mod ddc;
mod engine;
mod error;
mod ui;

fn setup_logs() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    // stdout carries the interface, logs go to stderr
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(format!(
        "warn,{}=warn",
        env!("CARGO_CRATE_NAME")
    )));

    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(journal_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logs();
    let tunables = Tunables::from_env();
    let gateway = Arc::new(DdcutilGateway::new());

    let displays = match enumerate(gateway.clone(), &tunables).await {
        Ok(displays) => displays,
        Err(EnumerationError::ToolMissing) => {
            eprintln!("Error: ddcutil is not installed");
            eprintln!("  Debian/Ubuntu: sudo apt install ddcutil");
            eprintln!("  Fedora:        sudo dnf install ddcutil");
            eprintln!("  Arch:          sudo pacman -S ddcutil");
            eprintln!("Then load the I2C driver and grant yourself bus access:");
            eprintln!("  sudo modprobe i2c-dev && sudo usermod -aG i2c $USER");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            eprintln!("Error: {err}");
            if matches!(err, EnumerationError::NoDisplays) {
                eprintln!("Make sure DDC/CI is enabled in your monitor's OSD menu");
            }
            return ExitCode::FAILURE;
        }
    };

    match run(&tunables, gateway, displays).await {
        Ok(()) => {
            println!("Brightness controller exited.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Find the displays and read their starting brightness, narrating progress
/// on stdout before the interface takes over.
async fn enumerate(
    gateway: Arc<DdcutilGateway>,
    tunables: &Tunables,
) -> Result<Vec<(DisplayNumber, u8)>, EnumerationError> {
    println!("Detecting displays (ddcutil detect)...");
    let detect = {
        let gateway = gateway.clone();
        tokio::task::spawn_blocking(move || gateway.detect())
    };
    let numbers = tokio::time::timeout(tunables.detect_timeout, detect)
        .await
        .map_err(|_| EnumerationError::Timeout(tunables.detect_timeout))?
        .map_err(|err| EnumerationError::Io(std::io::Error::other(err)))??;

    println!(
        "Found {} display(s), reading brightness levels...",
        numbers.len()
    );
    let mut displays = Vec::with_capacity(numbers.len());
    for number in numbers {
        let read = {
            let gateway = gateway.clone();
            tokio::task::spawn_blocking(move || gateway.read_brightness(number))
        };
        // enumeration already proved the display exists, so a failed or slow
        // read only costs the accurate starting point
        let brightness = match tokio::time::timeout(tunables.read_timeout, read).await {
            Ok(Ok(Ok(percent))) => percent,
            Ok(Ok(Err(err))) => {
                warn!("display {number}: initial read failed ({err}), assuming 50%");
                50
            }
            Ok(Err(join_err)) => {
                warn!("display {number}: read task failed ({join_err}), assuming 50%");
                50
            }
            Err(_) => {
                warn!("display {number}: initial read timed out, assuming 50%");
                50
            }
        };
        println!("  Display {number}: {brightness}%");
        displays.push((number, brightness));
    }
    Ok(displays)
}

/// Wire up the engine, input, and renderer, and run until quit.
async fn run(
    tunables: &Tunables,
    gateway: Arc<DdcutilGateway>,
    displays: Vec<(DisplayNumber, u8)>,
) -> anyhow::Result<()> {
    let (engine, intents, snapshots) = Engine::new(tunables, gateway, displays);

    let _guard = TerminalGuard::acquire().context("failed to put the terminal into raw mode")?;
    let engine_task = tokio::spawn(engine.run());
    let input_task = tokio::spawn(ui::input::read_intents(intents));

    // ends when the engine drops its snapshot channel on quit
    ui::view::render_loop(snapshots)
        .await
        .context("failed to repaint the interface")?;

    input_task.abort();
    engine_task.await.context("engine task failed")?;
    Ok(())
}
