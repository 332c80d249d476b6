//! One outbound upload of a recording.
//!
//! An [`UploadSession`] owns its transport for exactly one exchange:
//! `Idle → Connecting → Connected → SendingHeader → SendingPayload → AwaitingReply`, ending in
//! `Succeeded` or `Failed(reason)`. Every transition is reported to an [`UploadObserver`] so the
//! caller can keep the display in step. Nothing is retried; the transport is released on every
//! terminal state.

pub mod reply;
pub mod transport;

use crate::clock::{Clock, Deadline};
use crate::config::DeviceConfig;
use crate::error::TransportFailure;
use crate::wav::{encode_header, HEADER_SIZE};
use reply::ReplyBuffer;
pub use transport::{
    ConnectPoll, Connector, Endpoint, ReadPoll, TcpConnector, TcpTransport, Transport,
    WriteStatus,
};

pub const CONTENT_TYPE: &str = "audio/wav";

/// Largest single read while waiting for the reply
const READ_CHUNK: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
pub enum UploadState {
    Idle,
    Connecting,
    Connected,
    SendingHeader,
    SendingPayload,
    AwaitingReply,
    Succeeded,
    Failed(TransportFailure),
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Succeeded | UploadState::Failed(_))
    }
}

/// Bytes of the audio file (header plus samples) handed to the transport so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: usize,
    pub total_bytes: usize,
}

pub trait UploadObserver {
    fn on_state(&mut self, state: &UploadState, progress: UploadProgress);

    /// Called after every flushed payload chunk
    fn on_chunk(&mut self, _progress: UploadProgress) {}
}

impl<F: FnMut(&UploadState, UploadProgress)> UploadObserver for F {
    fn on_state(&mut self, state: &UploadState, progress: UploadProgress) {
        self(state, progress)
    }
}

/// A complete reply from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReply {
    pub body: String,
    pub status_code: Option<u16>,
}

/// Request line and headers preceding the audio file
pub fn request_head(config: &DeviceConfig, content_length: usize) -> String {
    format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        config.upload_path,
        config.authority(),
        CONTENT_TYPE,
        content_length
    )
}

pub struct UploadSession<'a, T: Transport, C: Clock + ?Sized> {
    transport: T,
    config: &'a DeviceConfig,
    clock: &'a C,
    state: UploadState,
    progress: UploadProgress,
}

impl<'a, T: Transport, C: Clock + ?Sized> UploadSession<'a, T, C> {
    pub fn new(transport: T, config: &'a DeviceConfig, clock: &'a C) -> Self {
        Self {
            transport,
            config,
            clock,
            state: UploadState::Idle,
            progress: UploadProgress::default(),
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn progress(&self) -> UploadProgress {
        self.progress
    }

    /// Upload `audio` (whole s16le samples) and wait for the service's reply.
    ///
    /// Consumes the session; the transport is closed before this returns.
    pub fn run<O: UploadObserver + ?Sized>(
        mut self,
        audio: &[u8],
        observer: &mut O,
    ) -> Result<UploadReply, TransportFailure> {
        let sample_count = (audio.len() / 2) as u32;
        self.progress = UploadProgress {
            bytes_sent: 0,
            total_bytes: HEADER_SIZE + sample_count as usize * 2,
        };

        let result = self.exchange(&audio[..sample_count as usize * 2], observer);
        self.transport.close();

        match result {
            Ok(reply) => {
                let reply = UploadReply {
                    body: reply.body(),
                    status_code: reply.status_code(),
                };
                log::info!(
                    "✅ Upload complete: {} bytes sent, reply status {:?}",
                    self.progress.bytes_sent,
                    reply.status_code
                );
                self.transition(UploadState::Succeeded, observer);
                Ok(reply)
            }
            Err(failure) => {
                log::error!(
                    "❌ Upload failed in {}: {} ({}/{} bytes sent)",
                    self.state,
                    failure,
                    self.progress.bytes_sent,
                    self.progress.total_bytes
                );
                self.transition(UploadState::Failed(failure), observer);
                Err(failure)
            }
        }
    }

    fn exchange<O: UploadObserver + ?Sized>(
        &mut self,
        audio: &[u8],
        observer: &mut O,
    ) -> Result<ReplyBuffer, TransportFailure> {
        self.connect(observer)?;
        self.send_header(audio, observer)?;
        self.send_payload(audio, observer)?;
        self.await_reply(observer)
    }

    fn connect<O: UploadObserver + ?Sized>(
        &mut self,
        observer: &mut O,
    ) -> Result<(), TransportFailure> {
        self.transition(UploadState::Connecting, observer);

        let endpoint = Endpoint::new(self.config.server_host.as_str(), self.config.server_port);
        if let Err(e) = self.transport.connect(&endpoint) {
            log::error!("❌ Could not issue connect to {}: {}", endpoint, e);
            return Err(TransportFailure::ConnectRejected);
        }

        let deadline = Deadline::after(self.clock, self.config.connect_budget());
        loop {
            match self.transport.poll_connect() {
                ConnectPoll::Connected => break,
                ConnectPoll::Failed => return Err(TransportFailure::ConnectRejected),
                ConnectPoll::Pending => {}
            }
            if deadline.expired(self.clock) {
                return Err(TransportFailure::ConnectTimeout);
            }
            self.clock.sleep(self.config.poll_interval);
        }

        log::info!("🔗 Connected to {}", endpoint);
        self.transition(UploadState::Connected, observer);
        Ok(())
    }

    fn send_header<O: UploadObserver + ?Sized>(
        &mut self,
        audio: &[u8],
        observer: &mut O,
    ) -> Result<(), TransportFailure> {
        self.transition(UploadState::SendingHeader, observer);

        let header = encode_header((audio.len() / 2) as u32);
        let head = request_head(self.config, header.file_len());
        self.write(head.as_bytes())?;
        self.write(&header.to_bytes())?;
        self.progress.bytes_sent += HEADER_SIZE;
        if self.transport.flush() == WriteStatus::Rejected {
            return Err(TransportFailure::WriteRejected);
        }
        Ok(())
    }

    fn send_payload<O: UploadObserver + ?Sized>(
        &mut self,
        audio: &[u8],
        observer: &mut O,
    ) -> Result<(), TransportFailure> {
        self.transition(UploadState::SendingPayload, observer);

        for chunk in audio.chunks(self.config.chunk_size) {
            self.write(chunk)?;
            if self.transport.flush() == WriteStatus::Rejected {
                return Err(TransportFailure::WriteRejected);
            }
            self.progress.bytes_sent += chunk.len();
            observer.on_chunk(self.progress);
            log::trace!(
                "📤 {}/{} bytes sent",
                self.progress.bytes_sent,
                self.progress.total_bytes
            );
        }
        Ok(())
    }

    fn await_reply<O: UploadObserver + ?Sized>(
        &mut self,
        observer: &mut O,
    ) -> Result<ReplyBuffer, TransportFailure> {
        self.transition(UploadState::AwaitingReply, observer);

        let mut reply = ReplyBuffer::new(self.config.response_capacity);
        let mut scratch = vec![0u8; READ_CHUNK.min(self.config.response_capacity)];
        let deadline = Deadline::after(self.clock, self.config.reply_timeout);

        loop {
            let want = reply.remaining().min(scratch.len());
            let received = match self.transport.poll_read(&mut scratch[..want]) {
                ReadPoll::Data(n) if n > 0 => {
                    reply
                        .push(&scratch[..n])
                        .map_err(|_| TransportFailure::ReplyOverflow)?;
                    log::debug!("📥 Received {} bytes ({} total)", n, reply.len());
                    if reply.is_complete() {
                        return Ok(reply);
                    }
                    true
                }
                ReadPoll::Closed => {
                    reply.mark_closed();
                    return if reply.is_complete() {
                        Ok(reply)
                    } else {
                        Err(TransportFailure::ConnectionClosed)
                    };
                }
                ReadPoll::Data(_) | ReadPoll::Pending => false,
            };
            if deadline.expired(self.clock) {
                return Err(TransportFailure::ReplyTimeout);
            }
            // Keep draining while data arrives
            if !received {
                self.clock.sleep(self.config.poll_interval);
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportFailure> {
        match self.transport.write(bytes) {
            WriteStatus::Accepted => Ok(()),
            WriteStatus::Rejected => Err(TransportFailure::WriteRejected),
        }
    }

    fn transition<O: UploadObserver + ?Sized>(&mut self, state: UploadState, observer: &mut O) {
        log::debug!("📡 Upload state: {} -> {}", self.state, state);
        self.state = state;
        observer.on_state(&self.state, self.progress);
    }
}
