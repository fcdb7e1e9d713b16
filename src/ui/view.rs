// SPDX-License-Identifier: GPL-3.0-only
//! In-place snapshot renderer
//!
//! Paints a fixed block on the main screen (never the alternate screen) and
//! repaints by moving the cursor back up over it, clearing each line to its
//! end. The scrollback above the block stays intact and nothing flickers.

use std::io::{self, Stdout, Write};

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::style::{Color, Print, Stylize};
use crossterm::terminal::{Clear, ClearType};
use tokio::sync::watch;

use crate::engine::{DisplaySnapshot, Selection, Snapshot};

const RULE_WIDTH: usize = 60;
const BAR_WIDTH: usize = 40;

// muted maroon/port palette
const MAROON: Color = Color::Rgb { r: 139, g: 69, b: 89 };
const DEEP_WINE: Color = Color::Rgb { r: 88, g: 44, b: 55 };
const ROSE_GOLD: Color = Color::Rgb { r: 183, g: 110, b: 121 };
const SAGE: Color = Color::Rgb { r: 87, g: 116, b: 90 };
const WARM_GRAY: Color = Color::Rgb { r: 120, g: 113, b: 108 };
const CREAM: Color = Color::Rgb { r: 242, g: 234, b: 220 };

/// Drive the painter from the engine's snapshot channel. Returns once the
/// engine is gone, after erasing the painted block.
pub async fn render_loop(mut snapshots: watch::Receiver<Snapshot>) -> io::Result<()> {
    let mut painter = Painter::stdout();
    let first = snapshots.borrow_and_update().clone();
    painter.paint(&first)?;
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        painter.paint(&snapshot)?;
    }
    painter.clear()
}

/// Writes the interface block and remembers its height so the next paint
/// can overwrite it in place.
pub struct Painter<W: Write> {
    out: W,
    painted: u16,
}

impl Painter<Stdout> {
    pub fn stdout() -> Self {
        Painter {
            out: io::stdout(),
            painted: 0,
        }
    }
}

impl<W: Write> Painter<W> {
    pub fn paint(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        if self.painted > 0 {
            queue!(self.out, MoveUp(self.painted))?;
        }
        let lines = layout(snapshot);
        for line in &lines {
            // raw mode needs the explicit carriage return
            queue!(
                self.out,
                Print(line),
                Clear(ClearType::UntilNewLine),
                Print("\r\n")
            )?;
        }
        self.painted = lines.len() as u16;
        self.out.flush()
    }

    /// Erase the painted block, leaving the cursor where it began.
    pub fn clear(&mut self) -> io::Result<()> {
        if self.painted > 0 {
            queue!(
                self.out,
                MoveUp(self.painted),
                MoveToColumn(0),
                Clear(ClearType::FromCursorDown)
            )?;
            self.painted = 0;
        }
        self.out.flush()
    }
}

fn layout(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::with_capacity(snapshot.displays.len() + 8);

    lines.push("═".repeat(RULE_WIDTH).with(DEEP_WINE).to_string());
    lines.push(format!(
        "{pad}{m} {title} {m}{pad}",
        pad = " ".repeat(19),
        m = "◈".with(ROSE_GOLD),
        title = "Brightness Control".with(CREAM),
    ));
    lines.push("═".repeat(RULE_WIDTH).with(DEEP_WINE).to_string());
    lines.push(String::new());

    lines.push(format!(
        "{} {} {}",
        mode_text(snapshot.selection).with(ROSE_GOLD),
        "│".with(WARM_GRAY),
        format!("Step: {}", snapshot.step).with(CREAM),
    ));
    lines.push(String::new());

    for display in &snapshot.displays {
        lines.push(display_row(display));
    }

    lines.push(String::new());
    lines.push("─".repeat(RULE_WIDTH).with(WARM_GRAY).to_string());
    lines.push(legend());
    lines
}

fn display_row(display: &DisplaySnapshot) -> String {
    let marker = if display.selected {
        "▸".with(ROSE_GOLD)
    } else {
        "·".with(WARM_GRAY)
    };
    let shown = display.shown();
    let filled = filled_cells(shown);
    let unsettled = if display.unsettled() {
        "◉".with(SAGE).to_string()
    } else {
        " ".to_string()
    };

    let mut row = format!(
        "{marker} {label} [{filled_bar}{empty_bar}] {percent} {unsettled}",
        label = format!("Display {}:", display.number).with(CREAM),
        filled_bar = "█".repeat(filled).with(ROSE_GOLD),
        empty_bar = "·".repeat(BAR_WIDTH - filled).with(WARM_GRAY),
        percent = format!("{shown:3}%").with(ROSE_GOLD),
    );
    if let Some(err) = &display.last_error {
        row.push_str(&format!(" {}", format!("⚠ {err}").with(MAROON)));
    }
    row
}

fn legend() -> String {
    let key = |k: &str| k.with(CREAM).to_string();
    format!(
        "{l}{a}{m1}{b}{m2}{c}{m3}{d}{r}",
        l = "[".with(WARM_GRAY),
        a = key("←/→"),
        m1 = "] Brightness  [".with(WARM_GRAY),
        b = key("↑/↓"),
        m2 = "] Step  [".with(WARM_GRAY),
        c = key("0-9"),
        m3 = "] Select  [".with(WARM_GRAY),
        d = key("q/Esc"),
        r = "] Quit".with(WARM_GRAY),
    )
}

fn mode_text(selection: Selection) -> String {
    match selection {
        Selection::AllDisplays => "Mode: ALL displays".to_string(),
        Selection::SingleDisplay(n) => format!("Mode: Display {n}"),
    }
}

fn filled_cells(percent: u8) -> usize {
    (usize::from(percent) * BAR_WIDTH + 50) / 100
}
