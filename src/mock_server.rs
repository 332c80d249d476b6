//! Stand-in for the remote scheduling service.
//!
//! Accepts `POST <path>` uploads with a `Content-Length` body, checks the body is a 16-bit mono
//! WAV file, optionally stores it as `<uuid>.wav`, and answers with a flat JSON acknowledgment
//! naming the event to schedule.

use hound::WavReader;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::io::{BufRead, BufReader, Cursor, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::audio_capture::MAX_SAMPLES;
use crate::wav::HEADER_SIZE;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct MockServerConfig {
    /// Address to bind the TCP server to (use "127.0.0.1:0" for random port)
    pub bind_address: String,
    pub upload_path: String,
    /// Event name returned for every accepted upload
    pub event_name: String,
    /// Status returned for every accepted upload
    pub status: String,
    /// Directory to store accepted uploads in
    pub upload_dir: Option<PathBuf>,
    /// Largest accepted body
    pub max_body: usize,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            upload_path: "/upload".to_string(),
            event_name: "Call mom".to_string(),
            status: "confirmed".to_string(),
            upload_dir: None,
            max_body: HEADER_SIZE + MAX_SAMPLES * 2,
        }
    }
}

/// Acknowledgment body
#[derive(Debug, Serialize)]
struct UploadAck {
    id: String,
    name: String,
    status: String,
}

impl UploadAck {
    fn rejected(status: &str) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            status: status.to_string(),
        }
    }
}

/// An accepted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedUpload {
    pub id: String,
    pub sample_rate: u32,
    pub sample_count: u32,
    pub stored_at: Option<PathBuf>,
}

type Uploads = Arc<Mutex<Vec<ReceivedUpload>>>;

pub struct MockUploadServer {
    config: MockServerConfig,
    should_stop: Arc<AtomicBool>,
    uploads: Uploads,
}

impl MockUploadServer {
    pub fn new(config: MockServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(dir) = &config.upload_dir {
            std::fs::create_dir_all(dir)?;
        }

        info!("🗓️ Mock upload server configured:");
        info!("  📮 Path: {}", config.upload_path);
        info!("  📝 Reply: '{}' ({})", config.event_name, config.status);
        if let Some(dir) = &config.upload_dir {
            info!("  📁 Storing uploads in {}", dir.display());
        }

        Ok(Self {
            config,
            should_stop: Arc::new(AtomicBool::new(false)),
            uploads: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Start accepting connections and return the actual bound port
    pub fn start(&mut self) -> Result<u16, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&self.config.bind_address)?;
        let port = listener.local_addr()?.port();
        info!("🗓️ Mock upload server listening on port {}", port);

        let config = self.config.clone();
        let should_stop = self.should_stop.clone();
        let uploads = self.uploads.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                if should_stop.load(Ordering::Relaxed) {
                    break;
                }

                match stream {
                    Ok(stream) => {
                        let config = config.clone();
                        let uploads = uploads.clone();
                        thread::spawn(move || {
                            if let Err(e) = Self::handle_client(stream, &config, &uploads) {
                                error!("Client error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Connection error: {}", e);
                    }
                }
            }
            info!("🛑 Mock upload server stopped");
        });

        Ok(port)
    }

    /// Start the server in a background thread and return a handle for testing
    pub fn start_background(mut self) -> Result<MockServerHandle, Box<dyn std::error::Error>> {
        let port = self.start()?;
        Ok(MockServerHandle {
            port,
            should_stop: self.should_stop.clone(),
            uploads: self.uploads.clone(),
        })
    }

    fn handle_client(
        stream: TcpStream,
        config: &MockServerConfig,
        uploads: &Uploads,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let peer = stream.peer_addr()?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = stream;

        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut content_length = None;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse::<usize>().ok();
                }
            }
        }
        info!("📨 {} {} from {} ({:?} bytes)", method, path, peer, content_length);

        if method != "POST" || path != config.upload_path {
            return Self::reject(&mut writer, 404, "Not Found", "not_found");
        }
        let length = match content_length {
            Some(length) if length <= config.max_body => length,
            Some(length) => {
                warn!("⚠️ Upload of {} bytes exceeds {}", length, config.max_body);
                return Self::reject(&mut writer, 413, "Payload Too Large", "rejected");
            }
            None => {
                warn!("⚠️ Upload without Content-Length");
                return Self::reject(&mut writer, 411, "Length Required", "rejected");
            }
        };

        let mut body = vec![0u8; length];
        reader.read_exact(&mut body)?;

        let upload = match Self::accept_upload(&body, config) {
            Ok(upload) => upload,
            Err(e) => {
                warn!("⚠️ Rejected upload from {}: {}", peer, e);
                return Self::reject(&mut writer, 400, "Bad Request", "rejected");
            }
        };
        info!(
            "🎙️ Upload {} accepted: {} samples at {}Hz",
            upload.id, upload.sample_count, upload.sample_rate
        );

        let ack = UploadAck {
            id: upload.id.clone(),
            name: config.event_name.clone(),
            status: config.status.clone(),
        };
        if let Ok(mut uploads) = uploads.lock() {
            uploads.push(upload);
        }
        Self::respond(&mut writer, 200, "OK", &ack)?;
        debug!("📤 Acknowledged upload {}", ack.id);
        Ok(())
    }

    fn accept_upload(
        body: &[u8],
        config: &MockServerConfig,
    ) -> Result<ReceivedUpload, Box<dyn std::error::Error>> {
        let reader = WavReader::new(Cursor::new(body))?;
        let spec = reader.spec();
        if spec.channels != 1 {
            return Err(format!("Expected mono audio, got {} channels", spec.channels).into());
        }
        if spec.bits_per_sample != 16 {
            return Err(format!("Expected 16-bit audio, got {} bits", spec.bits_per_sample).into());
        }

        let id = uuid::Uuid::new_v4().to_string();
        let stored_at = match &config.upload_dir {
            Some(dir) => {
                let path = dir.join(format!("{}.wav", id));
                std::fs::write(&path, body)?;
                Some(path)
            }
            None => None,
        };

        Ok(ReceivedUpload {
            id,
            sample_rate: spec.sample_rate,
            sample_count: reader.len(),
            stored_at,
        })
    }

    fn reject(
        writer: &mut TcpStream,
        code: u16,
        reason: &str,
        status: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Self::respond(writer, code, reason, &UploadAck::rejected(status))
    }

    fn respond(
        writer: &mut TcpStream,
        code: u16,
        reason: &str,
        ack: &UploadAck,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let body = serde_json::to_string(ack)?;
        write!(
            writer,
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            code,
            reason,
            body.len(),
            body
        )?;
        writer.flush()?;
        Ok(())
    }
}

/// Handle to a running [`MockUploadServer`]; stops it on drop
pub struct MockServerHandle {
    pub port: u16,
    should_stop: Arc<AtomicBool>,
    uploads: Uploads,
}

impl MockServerHandle {
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Uploads accepted so far
    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.uploads
            .lock()
            .map(|uploads| uploads.clone())
            .unwrap_or_default()
    }

    pub fn stop(&self) {
        self.should_stop.store(true, Ordering::Relaxed);
        // Wake the accept loop so it sees the flag
        let _ = TcpStream::connect(self.address());
    }
}

impl Drop for MockServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
