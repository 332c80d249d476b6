//! Human-facing hardware: display, status LED, LED matrix, buzzer and the two buttons.
//!
//! The controller only ever hands the panel a rendered [`StatusFrame`]; panels never look at
//! the event table themselves.

use crate::indicator::{Rgb, StatusColor, StatusFrame};
use std::time::Duration;

/// Confirmation tone
pub const BEEP_FREQUENCY_HZ: u32 = 1_000;
pub const BEEP_DURATION: Duration = Duration::from_millis(500);

/// Matrix side length; cells are numbered row-major from the top left
const MATRIX_SIDE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Button {
    /// Confirms the next scheduled event
    A,
    /// Starts and stops a recording
    B,
}

pub trait Panel {
    fn show(&mut self, frame: &StatusFrame);
    fn beep(&mut self);
}

/// Non-blocking source of button presses
pub trait ButtonInput {
    fn poll(&mut self) -> Option<Button>;
}

impl ButtonInput for crossbeam_channel::Receiver<Button> {
    fn poll(&mut self) -> Option<Button> {
        self.try_recv().ok()
    }
}

impl<F: FnMut() -> Option<Button>> ButtonInput for F {
    fn poll(&mut self) -> Option<Button> {
        self()
    }
}

/// Panel that draws frames on the terminal
#[derive(Default)]
pub struct ConsolePanel {
    last: Option<StatusFrame>,
}

impl ConsolePanel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Panel for ConsolePanel {
    fn show(&mut self, frame: &StatusFrame) {
        if self.last.as_ref() == Some(frame) {
            return;
        }

        println!("┌────────────────┐ {}", led_symbol(frame.status_led));
        for row in frame.text.rows() {
            println!("│{:<16}│", row);
        }
        println!("└────────────────┘");
        for cells in frame.grid.cells().chunks(MATRIX_SIDE) {
            let line: String = cells.iter().map(|c| cell_symbol(*c)).collect();
            println!("  {}", line);
        }
        log::debug!(
            "🖥️ {} | {} | led {} | {} cells lit",
            frame.text.line1,
            frame.text.line2,
            frame.status_led,
            frame.grid.lit_count()
        );

        self.last = Some(frame.clone());
    }

    fn beep(&mut self) {
        println!("🔔 beep ({} Hz, {:?})", BEEP_FREQUENCY_HZ, BEEP_DURATION);
    }
}

fn led_symbol(color: StatusColor) -> &'static str {
    match color {
        StatusColor::Off => "⚫",
        StatusColor::Red => "🔴",
        StatusColor::Green => "🟢",
        StatusColor::Yellow => "🟡",
    }
}

fn cell_symbol(color: Rgb) -> char {
    if color == Rgb::OFF {
        '·'
    } else {
        '■'
    }
}

/// Panel that keeps everything it was asked to show
#[derive(Debug, Default)]
pub struct RecordingPanel {
    pub frames: Vec<StatusFrame>,
    pub beeps: usize,
}

impl RecordingPanel {
    pub fn last(&self) -> Option<&StatusFrame> {
        self.frames.last()
    }

    /// First display lines in the order they were shown
    pub fn headlines(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.text.line1.as_str()).collect()
    }
}

impl Panel for RecordingPanel {
    fn show(&mut self, frame: &StatusFrame) {
        self.frames.push(frame.clone());
    }

    fn beep(&mut self) {
        self.beeps += 1;
    }
}
