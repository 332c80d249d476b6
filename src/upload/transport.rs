use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Remote upload service address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Progress of an issued connect request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPoll {
    Pending,
    Connected,
    /// The stack reported an error for this attempt
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Accepted,
    Rejected,
}

/// Result of polling for inbound bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPoll {
    Data(usize),
    Pending,
    /// Peer closed the connection or the stack reported an error
    Closed,
}

/// Outbound connection capability used by an upload session.
///
/// Signals the underlying stack would deliver through callbacks (connect completion, inbound
/// data, errors) are surfaced through the `poll_*` methods so the session can wait on them
/// against an explicit deadline.
pub trait Transport {
    /// Issue a connect request; completion is observed through [`Transport::poll_connect`]
    fn connect(&mut self, endpoint: &Endpoint) -> io::Result<()>;

    fn poll_connect(&mut self) -> ConnectPoll;

    /// Queue bytes for transmission
    fn write(&mut self, bytes: &[u8]) -> WriteStatus;

    /// Push queued bytes onto the wire
    fn flush(&mut self) -> WriteStatus;

    fn poll_read(&mut self, buf: &mut [u8]) -> ReadPoll;

    /// Release the connection
    fn close(&mut self);
}

/// Creates one fresh transport per upload session
pub trait Connector {
    type Transport: Transport;

    fn open(&mut self) -> Self::Transport;
}

/// [`Transport`] over a blocking `std::net::TcpStream` with short timeouts
pub struct TcpTransport {
    addrs: Vec<SocketAddr>,
    stream: Option<TcpStream>,
    attempt_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl TcpTransport {
    pub fn new(attempt_timeout: Duration) -> Self {
        Self {
            addrs: Vec::new(),
            stream: None,
            attempt_timeout,
            read_timeout: Duration::from_millis(10),
            write_timeout: Duration::from_secs(5),
        }
    }

    fn configure(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(self.write_timeout))?;
        Ok(())
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, endpoint: &Endpoint) -> io::Result<()> {
        self.addrs = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()?
            .collect();
        if self.addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address for {}", endpoint),
            ));
        }
        log::debug!("🔌 Resolved {} to {:?}", endpoint, self.addrs);
        Ok(())
    }

    fn poll_connect(&mut self) -> ConnectPoll {
        if self.stream.is_some() {
            return ConnectPoll::Connected;
        }

        let mut last_error = None;
        for addr in &self.addrs {
            match TcpStream::connect_timeout(addr, self.attempt_timeout) {
                Ok(stream) => {
                    if let Err(e) = self.configure(&stream) {
                        log::warn!("⚠️ Failed to configure socket: {}", e);
                        return ConnectPoll::Failed;
                    }
                    self.stream = Some(stream);
                    return ConnectPoll::Connected;
                }
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                ConnectPoll::Pending
            }
            Some(e) => {
                log::warn!("❌ Connect failed: {}", e);
                ConnectPoll::Failed
            }
            None => ConnectPoll::Failed,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> WriteStatus {
        match self.stream.as_mut().map(|s| s.write_all(bytes)) {
            Some(Ok(())) => WriteStatus::Accepted,
            Some(Err(e)) => {
                log::warn!("❌ Write of {} bytes failed: {}", bytes.len(), e);
                WriteStatus::Rejected
            }
            None => WriteStatus::Rejected,
        }
    }

    fn flush(&mut self) -> WriteStatus {
        match self.stream.as_mut().map(|s| s.flush()) {
            Some(Ok(())) => WriteStatus::Accepted,
            _ => WriteStatus::Rejected,
        }
    }

    fn poll_read(&mut self, buf: &mut [u8]) -> ReadPoll {
        let Some(stream) = self.stream.as_mut() else {
            return ReadPoll::Closed;
        };
        match stream.read(buf) {
            Ok(0) => ReadPoll::Closed,
            Ok(n) => ReadPoll::Data(n),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                ReadPoll::Pending
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => ReadPoll::Pending,
            Err(e) => {
                log::warn!("❌ Read failed: {}", e);
                ReadPoll::Closed
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            log::debug!("🔚 TCP connection released");
        }
    }
}

/// Opens a [`TcpTransport`] per session
pub struct TcpConnector {
    attempt_timeout: Duration,
}

impl TcpConnector {
    pub fn new(attempt_timeout: Duration) -> Self {
        Self { attempt_timeout }
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn open(&mut self) -> TcpTransport {
        TcpTransport::new(self.attempt_timeout)
    }
}
