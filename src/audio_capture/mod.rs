//! Voice note capture into a fixed-capacity sample buffer.
//!
//! One [`RecordingSession`] lives for the lifetime of the device and is overwritten wholesale
//! by every [`RecordingSession::start`]. Samples are 12-bit ADC readings scaled to 16 bits and
//! stored little-endian, two bytes per sample.

use crate::clock::Clock;
use std::time::Duration;

/// Capture sample rate in Hz
pub const SAMPLE_RATE: u32 = 8_000;
pub const BITS_PER_SAMPLE: u16 = 16;
pub const CHANNELS: u16 = 1;
/// Ten seconds at 8kHz
pub const MAX_SAMPLES: usize = 80_000;
/// One sample period at [`SAMPLE_RATE`]
pub const SAMPLE_PERIOD: Duration = Duration::from_micros(125);

const ADC_MAX: u16 = 0x0FFF;

/// Anything that yields one raw 12-bit analog reading per call
pub trait SampleSource {
    fn read_raw(&mut self) -> u16;
}

impl<F: FnMut() -> u16> SampleSource for F {
    fn read_raw(&mut self) -> u16 {
        self()
    }
}

/// Scale a 12-bit ADC reading to the full unsigned 16-bit range
pub fn quantize(raw: u16) -> u16 {
    raw.min(ADC_MAX) << 4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillState {
    Filling,
    /// Capacity reached; filling has halted and the session is flagged truncated
    Full,
}

/// Storage for the current recording
pub struct RecordingSession {
    buffer: Box<[u8]>,
    max_samples: usize,
    sample_count: usize,
    recording: bool,
    truncated: bool,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SAMPLES)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            buffer: vec![0u8; max_samples * 2].into_boxed_slice(),
            max_samples,
            sample_count: 0,
            recording: false,
            truncated: false,
        }
    }

    /// Reset the session and begin filling
    pub fn start(&mut self) {
        self.sample_count = 0;
        self.truncated = false;
        self.recording = true;
    }

    /// Append one raw reading. Has no effect once filling has stopped.
    pub fn push(&mut self, raw: u16) -> FillState {
        if !self.recording {
            return if self.truncated {
                FillState::Full
            } else {
                FillState::Filling
            };
        }

        if self.sample_count >= self.max_samples {
            self.recording = false;
            self.truncated = true;
            return FillState::Full;
        }

        let offset = self.sample_count * 2;
        self.buffer[offset..offset + 2].copy_from_slice(&quantize(raw).to_le_bytes());
        self.sample_count += 1;

        if self.sample_count == self.max_samples {
            self.recording = false;
            self.truncated = true;
            log::warn!("⚠️ Sample buffer full at {} samples", self.sample_count);
            FillState::Full
        } else {
            FillState::Filling
        }
    }

    /// Stop filling, keeping everything captured so far
    pub fn stop(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Raw s16le payload of the captured samples
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.sample_count * 2]
    }

    pub fn duration(&self) -> Duration {
        Duration::from_micros(self.sample_count as u64 * 1_000_000 / SAMPLE_RATE as u64)
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// How a capture ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureReport {
    pub sample_count: usize,
    /// Capacity was reached
    pub truncated: bool,
    /// The user stopped the capture before capacity
    pub cancelled: bool,
}

/// Fill `session` from `source` at the fixed sample rate until `should_stop` returns true or
/// the buffer is full. Cancelled recordings keep their samples.
pub fn capture<S, C, F>(
    session: &mut RecordingSession,
    source: &mut S,
    clock: &C,
    mut should_stop: F,
) -> CaptureReport
where
    S: SampleSource + ?Sized,
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    session.start();
    log::info!("🎙️ Capture started (max {} samples)", session.max_samples());

    // Sample k is due at start + k * SAMPLE_PERIOD; time spent reading is absorbed by the wait
    let start = clock.now();
    let mut taken: u32 = 0;
    let mut cancelled = false;
    while session.is_recording() {
        if should_stop() {
            session.stop();
            cancelled = true;
            break;
        }

        if session.push(source.read_raw()) == FillState::Full {
            break;
        }
        taken += 1;
        let due = start + SAMPLE_PERIOD * taken;
        let wait = due.saturating_duration_since(clock.now());
        if !wait.is_zero() {
            clock.sleep(wait);
        }
    }

    let report = CaptureReport {
        sample_count: session.sample_count(),
        truncated: session.is_truncated(),
        cancelled,
    };
    log::info!(
        "⏹️ Capture finished: {} samples ({:?}), truncated: {}",
        report.sample_count,
        session.duration(),
        report.truncated
    );
    report
}

/// Synthetic microphone producing a sine tone around ADC mid-scale
pub struct ToneSource {
    frequency_hz: f32,
    amplitude: f32,
    index: u64,
}

impl ToneSource {
    pub fn new(frequency_hz: f32) -> Self {
        Self {
            frequency_hz,
            amplitude: 1500.0,
            index: 0,
        }
    }
}

impl SampleSource for ToneSource {
    fn read_raw(&mut self) -> u16 {
        let t = self.index as f32 / SAMPLE_RATE as f32;
        self.index += 1;
        let phase = 2.0 * std::f32::consts::PI * self.frequency_hz * t;
        let value = 2048.0 + self.amplitude * phase.sin();
        value.clamp(0.0, ADC_MAX as f32) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_quantize_scales_twelve_bit_readings() {
        assert_eq!(quantize(0), 0);
        assert_eq!(quantize(1), 16);
        assert_eq!(quantize(0x0FFF), 0xFFF0);
        // Out of range readings clamp to the ADC maximum
        assert_eq!(quantize(0xFFFF), 0xFFF0);
    }

    #[test]
    fn test_samples_are_stored_little_endian() {
        let mut session = RecordingSession::with_capacity(4);
        session.start();
        session.push(0x0123);
        session.push(0x0001);

        assert_eq!(session.sample_count(), 2);
        assert_eq!(session.bytes(), &[0x30, 0x12, 0x10, 0x00]);
    }

    #[test]
    fn test_overflow_halts_and_flags_truncated() {
        let mut session = RecordingSession::with_capacity(3);
        session.start();
        assert_eq!(session.push(1), FillState::Filling);
        assert_eq!(session.push(2), FillState::Filling);
        assert_eq!(session.push(3), FillState::Full);

        assert!(session.is_truncated());
        assert!(!session.is_recording());
        assert_eq!(session.sample_count(), 3);

        // Further readings never overwrite what was captured
        assert_eq!(session.push(4), FillState::Full);
        assert_eq!(session.sample_count(), 3);
        assert_eq!(&session.bytes()[4..6], &quantize(3).to_le_bytes());
    }

    #[test]
    fn test_start_resets_previous_session() {
        let mut session = RecordingSession::with_capacity(2);
        session.start();
        session.push(1);
        session.push(2);
        assert!(session.is_truncated());

        session.start();
        assert_eq!(session.sample_count(), 0);
        assert!(!session.is_truncated());
        assert!(session.bytes().is_empty());
    }

    #[test]
    fn test_capture_until_cancelled_keeps_partial_recording() {
        let clock = ManualClock::new();
        let mut session = RecordingSession::with_capacity(100);
        let mut source = || 100u16;
        let mut polls = 0;

        let report = capture(&mut session, &mut source, &clock, || {
            polls += 1;
            polls > 40
        });

        assert_eq!(report.sample_count, 40);
        assert!(report.cancelled);
        assert!(!report.truncated);
        assert_eq!(session.bytes().len(), 80);
        assert_eq!(clock.total_slept(), SAMPLE_PERIOD * 40);
    }

    #[test]
    fn test_slow_reads_do_not_stretch_the_sample_period() {
        let clock = ManualClock::new();
        let start = clock.now();
        let mut session = RecordingSession::with_capacity(1000);
        let read_cost = Duration::from_micros(40);
        let mut source = || {
            clock.advance(read_cost);
            512u16
        };
        let mut polls = 0;

        let report = capture(&mut session, &mut source, &clock, || {
            polls += 1;
            polls > 800
        });

        assert_eq!(report.sample_count, 800);
        // 800 samples at 8kHz span exactly 100ms
        assert_eq!(clock.now() - start, SAMPLE_PERIOD * 800);
        assert_eq!(clock.total_slept(), (SAMPLE_PERIOD - read_cost) * 800);
    }

    #[test]
    fn test_reads_slower_than_the_period_never_sleep() {
        let clock = ManualClock::new();
        let mut session = RecordingSession::with_capacity(1000);
        let mut source = || {
            clock.advance(SAMPLE_PERIOD * 2);
            512u16
        };
        let mut polls = 0;

        capture(&mut session, &mut source, &clock, || {
            polls += 1;
            polls > 10
        });

        assert_eq!(clock.total_slept(), Duration::ZERO);
    }

    #[test]
    fn test_capture_stops_at_capacity() {
        let clock = ManualClock::new();
        let mut session = RecordingSession::with_capacity(10);
        let mut source = ToneSource::new(440.0);

        let report = capture(&mut session, &mut source, &clock, || false);

        assert_eq!(report.sample_count, 10);
        assert!(report.truncated);
        assert!(!report.cancelled);
    }
}
