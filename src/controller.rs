//! The device's single control loop.
//!
//! [`Device`] exclusively owns the event table, the recording buffer and every peripheral, so
//! all mutation happens from [`Device::handle`] on one thread. Each button press runs to
//! completion: failures are turned into a status screen, held for the configured delay, and
//! the device returns to idle.

use crate::audio_capture::{capture, RecordingSession, SampleSource};
use crate::clock::Clock;
use crate::config::DeviceConfig;
use crate::error::{EdgeError, Result};
use crate::indicator::{render, Screen};
use crate::panel::{Button, ButtonInput, Panel};
use crate::response::ParsedResponse;
use crate::schedule::{Booking, EventStore};
use crate::upload::{Connector, UploadProgress, UploadSession, UploadState};
use std::time::Duration;

/// Pause between button polls while idle
pub const IDLE_POLL: Duration = Duration::from_millis(100);

/// What a button press led to
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No scheduled event to confirm
    Ignored,
    ConfirmationRequested { index: usize },
    ConfirmationCancelled,
    EventCompleted { index: usize },
    /// Capture was stopped before any sample was taken
    NothingRecorded,
    Booked(Booking),
    /// The failure screen that was shown
    Failed(Screen),
}

pub struct Device<P, B, S, K, C>
where
    P: Panel,
    B: ButtonInput,
    S: SampleSource,
    K: Connector,
    C: Clock,
{
    config: DeviceConfig,
    store: EventStore,
    recording: RecordingSession,
    panel: P,
    buttons: B,
    source: S,
    connector: K,
    clock: C,
    screen: Screen,
}

impl<P, B, S, K, C> Device<P, B, S, K, C>
where
    P: Panel,
    B: ButtonInput,
    S: SampleSource,
    K: Connector,
    C: Clock,
{
    pub fn new(
        config: DeviceConfig,
        panel: P,
        buttons: B,
        source: S,
        connector: K,
        clock: C,
    ) -> Self {
        let mut device = Self {
            config,
            store: EventStore::new(),
            recording: RecordingSession::new(),
            panel,
            buttons,
            source,
            connector,
            clock,
            screen: Screen::Idle,
        };
        device.show(Screen::Idle);
        device
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn recording(&self) -> &RecordingSession {
        &self.recording
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Poll buttons until `keep_running` returns false
    pub fn run_while<F: FnMut() -> bool>(&mut self, mut keep_running: F) {
        log::info!("🚀 Device loop started");
        while keep_running() {
            match self.buttons.poll() {
                Some(button) => {
                    self.handle(button);
                }
                None => self.clock.sleep(IDLE_POLL),
            }
        }
        log::info!("🛑 Device loop stopped");
    }

    /// React to one button press
    pub fn handle(&mut self, button: Button) -> Outcome {
        log::debug!("🔘 Button {} on {:?}", button, self.screen);

        let awaiting = match self.screen {
            Screen::AwaitingConfirmation { index } => Some(index),
            _ => None,
        };

        match (awaiting, button) {
            (Some(index), Button::A) => self.complete_event(index),
            (Some(_), Button::B) => {
                log::info!("↩️ Confirmation cancelled");
                self.show(Screen::Idle);
                Outcome::ConfirmationCancelled
            }
            (None, Button::A) => match self.store.next_scheduled() {
                Some((index, _)) => {
                    self.show(Screen::AwaitingConfirmation { index });
                    Outcome::ConfirmationRequested { index }
                }
                None => {
                    self.show(Screen::Idle);
                    Outcome::Ignored
                }
            },
            (None, Button::B) => self.record_and_book(),
        }
    }

    fn complete_event(&mut self, index: usize) -> Outcome {
        let description = self
            .store
            .get(index)
            .map(|e| e.description.clone())
            .unwrap_or_default();
        self.store.confirm_and_remove(index);
        self.panel.beep();
        self.hold(Screen::EventCompleted { description });
        Outcome::EventCompleted { index }
    }

    fn record_and_book(&mut self) -> Outcome {
        self.show(Screen::Recording);

        let buttons = &mut self.buttons;
        let report = capture(&mut self.recording, &mut self.source, &self.clock, || {
            buttons.poll() == Some(Button::B)
        });

        if report.truncated {
            let overflow = EdgeError::CaptureOverflow;
            log::warn!("⚠️ {}, uploading what was captured", overflow);
            self.hold(Screen::for_error(&overflow));
        } else {
            self.show(Screen::CaptureComplete);
            self.panel.beep();
            self.clock.sleep(self.config.status_hold / 2);
        }

        if report.sample_count == 0 {
            log::info!("🔇 Nothing recorded, skipping upload");
            self.show(Screen::Idle);
            return Outcome::NothingRecorded;
        }

        match self.upload_and_book() {
            Ok(booking) => Outcome::Booked(booking),
            Err(e) => {
                log::error!("❌ {}", e);
                let screen = Screen::for_error(&e);
                self.hold(screen.clone());
                Outcome::Failed(screen)
            }
        }
    }

    fn upload_and_book(&mut self) -> Result<Booking> {
        let transport = self.connector.open();
        let session = UploadSession::new(transport, &self.config, &self.clock);

        let store = &self.store;
        let panel = &mut self.panel;
        let screen = &mut self.screen;
        let mut observer = |state: &UploadState, progress: UploadProgress| {
            log::debug!(
                "📡 {} ({}/{} bytes)",
                state,
                progress.bytes_sent,
                progress.total_bytes
            );
            *screen = Screen::Upload(state.clone());
            panel.show(&render(store, screen));
        };
        let reply = session.run(self.recording.bytes(), &mut observer)?;

        self.show(Screen::Processing);
        log::debug!("📥 Reply body: {}", reply.body);
        let confirmed = ParsedResponse::parse(&reply.body).into_confirmed()?;
        let booking = self.store.book(&confirmed.name, &confirmed.id)?;

        log::info!(
            "📅 Booked '{}' (id {}) at {:02}:{:02}",
            confirmed.name,
            confirmed.id,
            booking.hour,
            booking.minute
        );
        self.panel.beep();
        self.hold(Screen::Booked {
            name: confirmed.name,
            booking: booking.clone(),
        });
        Ok(booking)
    }

    fn show(&mut self, screen: Screen) {
        self.screen = screen;
        self.panel.show(&render(&self.store, &self.screen));
    }

    /// Show a terminal status for the hold period, then return to idle
    fn hold(&mut self, screen: Screen) {
        self.show(screen);
        self.clock.sleep(self.config.status_hold);
        self.show(Screen::Idle);
    }
}
