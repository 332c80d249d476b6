//! Mapping from device state to what the user sees.
//!
//! [`render`] is total: every [`Screen`] and every [`UploadState`] has a defined two-line text,
//! status LED colour, and LED matrix image. Nothing here touches hardware; the controller pushes
//! the resulting [`StatusFrame`] through the panel.

use crate::error::{EdgeError, ResponseInvalid, ScheduleRejected, TransportFailure};
use crate::schedule::{Booking, EventStore, CAPACITY};
use crate::upload::UploadState;

/// Characters per display row (128px wide, 8px font)
pub const DISPLAY_COLUMNS: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Colour state of the 25-cell LED matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorGrid {
    cells: [Rgb; CAPACITY],
}

impl IndicatorGrid {
    pub fn get(&self, slot: usize) -> Option<Rgb> {
        self.cells.get(slot).copied()
    }

    /// Out-of-range slots are ignored
    pub fn set(&mut self, slot: usize, color: Rgb) {
        if let Some(cell) = self.cells.get_mut(slot) {
            *cell = color;
        }
    }

    pub fn cells(&self) -> &[Rgb; CAPACITY] {
        &self.cells
    }

    pub fn lit_count(&self) -> usize {
        self.cells.iter().filter(|c| **c != Rgb::OFF).count()
    }
}

impl Default for IndicatorGrid {
    fn default() -> Self {
        Self {
            cells: [Rgb::OFF; CAPACITY],
        }
    }
}

/// The single RGB status LED
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum StatusColor {
    Off,
    Red,
    Green,
    Yellow,
}

/// Two logical display lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayText {
    pub line1: String,
    pub line2: String,
}

impl DisplayText {
    pub fn new(line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            line1: line1.into(),
            line2: line2.into(),
        }
    }

    /// Physical display rows: `line1` wraps to at most 2 rows, `line2` to at most 3
    pub fn rows(&self) -> Vec<String> {
        let mut rows = wrap(&self.line1, 2);
        rows.extend(wrap(&self.line2, 3));
        rows
    }
}

fn wrap(text: &str, max_rows: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(DISPLAY_COLUMNS)
        .take(max_rows)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Everything the panel shows at one moment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFrame {
    pub text: DisplayText,
    pub status_led: StatusColor,
    pub grid: IndicatorGrid,
}

/// Interaction state driving the display
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    /// Waiting for a button; shows the next scheduled event
    Idle,
    /// Asking whether row `index` is done
    AwaitingConfirmation { index: usize },
    Recording,
    CaptureComplete,
    CaptureOverflow,
    Upload(UploadState),
    /// Decoding the reply and booking the event
    Processing,
    Booked { name: String, booking: Booking },
    ScheduleRejected(ScheduleRejected),
    ResponseInvalid(ResponseInvalid),
    EventCompleted { description: String },
}

impl Screen {
    /// Screen reporting a pipeline failure
    pub fn for_error(error: &EdgeError) -> Screen {
        match error {
            EdgeError::CaptureOverflow => Screen::CaptureOverflow,
            EdgeError::Transport(failure) => Screen::Upload(UploadState::Failed(*failure)),
            EdgeError::Schedule(rejected) => Screen::ScheduleRejected(*rejected),
            EdgeError::Response(invalid) => Screen::ResponseInvalid(*invalid),
        }
    }
}

/// Render the current screen over the event table's matrix image
pub fn render(store: &EventStore, screen: &Screen) -> StatusFrame {
    let (text, status_led) = match screen {
        Screen::Idle => (idle_text(store), StatusColor::Off),
        Screen::AwaitingConfirmation { index } => {
            let description = store
                .get(*index)
                .map(|e| e.description.as_str())
                .unwrap_or("event");
            (
                DisplayText::new(format!("Complete {}?", description), "A = yes, B = no"),
                StatusColor::Off,
            )
        }
        Screen::Recording => (
            DisplayText::new("Recording...", "Press B to stop"),
            StatusColor::Red,
        ),
        Screen::CaptureComplete => (
            DisplayText::new("Recording", "Complete!"),
            StatusColor::Green,
        ),
        Screen::CaptureOverflow => (
            DisplayText::new("Error!", "Max time exceeded"),
            StatusColor::Red,
        ),
        Screen::Upload(state) => upload_text(state),
        Screen::Processing => (
            DisplayText::new("Processing...", "Please wait"),
            StatusColor::Yellow,
        ),
        Screen::Booked { name, booking } => (
            DisplayText::new(
                "Event added",
                format!("{} at {:02}:{:02}", name, booking.hour, booking.minute),
            ),
            StatusColor::Green,
        ),
        Screen::ScheduleRejected(_) => (
            DisplayText::new("Error!", "Schedule full or no free hours"),
            StatusColor::Red,
        ),
        Screen::ResponseInvalid(ResponseInvalid::MissingName) => (
            DisplayText::new("Error!", "Invalid event"),
            StatusColor::Red,
        ),
        Screen::ResponseInvalid(ResponseInvalid::StatusNotConfirmed) => (
            DisplayText::new("Error!", "Status not confirmed"),
            StatusColor::Red,
        ),
        Screen::EventCompleted { description } => (
            DisplayText::new("Done", description.clone()),
            StatusColor::Green,
        ),
    };

    StatusFrame {
        text,
        status_led,
        grid: store.grid().clone(),
    }
}

fn idle_text(store: &EventStore) -> DisplayText {
    let line2 = match store.next_scheduled() {
        Some((_, event)) => format!(
            "Next: {} - {:02}:{:02}",
            event.description, event.hour, event.minute
        ),
        None => "No events".to_string(),
    };
    DisplayText::new("Press B to record", line2)
}

fn upload_text(state: &UploadState) -> (DisplayText, StatusColor) {
    match state {
        UploadState::Idle => (DisplayText::new("Upload", "Ready"), StatusColor::Off),
        UploadState::Connecting => (
            DisplayText::new("Connecting...", "Please wait"),
            StatusColor::Yellow,
        ),
        UploadState::Connected => (
            DisplayText::new("Connected", "Please wait"),
            StatusColor::Yellow,
        ),
        UploadState::SendingHeader | UploadState::SendingPayload => (
            DisplayText::new("Sending...", "Please wait"),
            StatusColor::Yellow,
        ),
        UploadState::AwaitingReply => (
            DisplayText::new("Waiting reply", "Please wait"),
            StatusColor::Yellow,
        ),
        UploadState::Succeeded => (
            DisplayText::new("Upload", "Complete!"),
            StatusColor::Green,
        ),
        UploadState::Failed(failure) => {
            let reason = match failure {
                TransportFailure::ConnectTimeout => "Connection timeout",
                TransportFailure::ConnectRejected => "Connection failed",
                TransportFailure::WriteRejected => "Send failed",
                TransportFailure::ReplyOverflow => "Reply too large",
                TransportFailure::ReplyTimeout => "No reply",
                TransportFailure::ConnectionClosed => "Connection lost",
            };
            (DisplayText::new("Error!", reason), StatusColor::Red)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_without_events() {
        let store = EventStore::new();
        let frame = render(&store, &Screen::Idle);
        assert_eq!(frame.text, DisplayText::new("Press B to record", "No events"));
        assert_eq!(frame.status_led, StatusColor::Off);
        assert_eq!(frame.grid.lit_count(), 0);
    }

    #[test]
    fn test_idle_shows_next_event_and_matrix() {
        let mut store = EventStore::new();
        store.book("Dentist", "42").unwrap();

        let frame = render(&store, &Screen::Idle);
        assert_eq!(frame.text.line2, "Next: Dentist - 08:00");
        assert_eq!(frame.grid.get(24), Some(Rgb::new(80, 0, 40)));
        assert_eq!(frame.grid.lit_count(), 1);
    }

    #[test]
    fn test_awaiting_confirmation() {
        let mut store = EventStore::new();
        store.book("Gym", "7").unwrap();

        let frame = render(&store, &Screen::AwaitingConfirmation { index: 0 });
        assert_eq!(frame.text, DisplayText::new("Complete Gym?", "A = yes, B = no"));
    }

    #[test]
    fn test_every_upload_state_has_a_frame() {
        let store = EventStore::new();
        let states = [
            UploadState::Idle,
            UploadState::Connecting,
            UploadState::Connected,
            UploadState::SendingHeader,
            UploadState::SendingPayload,
            UploadState::AwaitingReply,
            UploadState::Succeeded,
            UploadState::Failed(TransportFailure::ConnectTimeout),
            UploadState::Failed(TransportFailure::ConnectRejected),
            UploadState::Failed(TransportFailure::WriteRejected),
            UploadState::Failed(TransportFailure::ReplyOverflow),
            UploadState::Failed(TransportFailure::ReplyTimeout),
            UploadState::Failed(TransportFailure::ConnectionClosed),
        ];

        for state in states {
            let frame = render(&store, &Screen::Upload(state.clone()));
            assert!(!frame.text.line1.is_empty(), "no text for {}", state);
            let expected = match state {
                UploadState::Idle => StatusColor::Off,
                UploadState::Succeeded => StatusColor::Green,
                UploadState::Failed(_) => StatusColor::Red,
                _ => StatusColor::Yellow,
            };
            assert_eq!(frame.status_led, expected, "wrong colour for {}", state);
        }
    }

    #[test]
    fn test_errors_map_to_red_screens() {
        let store = EventStore::new();
        let errors = [
            EdgeError::CaptureOverflow,
            EdgeError::Transport(TransportFailure::WriteRejected),
            EdgeError::Schedule(ScheduleRejected::NoFreeHour),
            EdgeError::Response(ResponseInvalid::StatusNotConfirmed),
        ];
        for error in &errors {
            let frame = render(&store, &Screen::for_error(error));
            assert_eq!(frame.status_led, StatusColor::Red, "{}", error);
            assert_eq!(frame.text.line1, "Error!");
        }
    }

    #[test]
    fn test_rows_wrap_at_sixteen_columns() {
        let text = DisplayText::new("Complete Call mom today?", "A = yes, B = no");
        assert_eq!(
            text.rows(),
            vec!["Complete Call mo", "m today?", "A = yes, B = no"]
        );

        let long = DisplayText::new("x".repeat(40), "y".repeat(60));
        let rows = long.rows();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.chars().count() <= DISPLAY_COLUMNS));
    }
}
