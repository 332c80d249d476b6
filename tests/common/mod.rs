//! In-memory transport for driving upload sessions without a network.
#![allow(dead_code)]

use agenda_edge_rs::upload::{ConnectPoll, Connector, Endpoint, ReadPoll, Transport, WriteStatus};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

/// How a [`ScriptedTransport`] behaves
#[derive(Debug, Clone, Default)]
pub struct TransportScript {
    /// Number of `Pending` polls before the connect signal; `None` never connects
    pub connect_after: Option<usize>,
    /// Report a stack error instead of connecting
    pub refuse: bool,
    /// Zero-based index of the first rejected write
    pub reject_write: Option<usize>,
    /// Reply delivered one chunk per read
    pub reply: Vec<Vec<u8>>,
    /// Report the peer closing once the reply is drained
    pub close_after_reply: bool,
}

impl TransportScript {
    /// Connects immediately and answers with `reply` in one piece
    pub fn replying(reply: &str) -> Self {
        Self {
            connect_after: Some(0),
            reply: vec![reply.as_bytes().to_vec()],
            ..Self::default()
        }
    }

    pub fn never_connecting() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn reject_write_at(mut self, index: usize) -> Self {
        self.reject_write = Some(index);
        self
    }

    pub fn with_reply_chunks(mut self, chunks: &[&[u8]]) -> Self {
        self.reply = chunks.iter().map(|c| c.to_vec()).collect();
        self
    }

    pub fn closing_after_reply(mut self) -> Self {
        self.close_after_reply = true;
        self
    }
}

/// Everything a scripted transport was asked to do
#[derive(Debug, Default)]
pub struct TransportLog {
    pub sessions: usize,
    pub endpoint: Option<Endpoint>,
    pub connect_polls: usize,
    pub writes: Vec<Vec<u8>>,
    pub flushes: usize,
    pub reads: usize,
    pub closed: bool,
}

impl TransportLog {
    /// All accepted bytes in write order
    pub fn sent(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

pub type SharedLog = Rc<RefCell<TransportLog>>;

pub struct ScriptedTransport {
    script: TransportScript,
    log: SharedLog,
    pending_reply: VecDeque<Vec<u8>>,
    connected: bool,
    write_attempts: usize,
}

impl ScriptedTransport {
    pub fn new(script: TransportScript) -> Self {
        Self::with_log(script, SharedLog::default())
    }

    pub fn with_log(script: TransportScript, log: SharedLog) -> Self {
        log.borrow_mut().sessions += 1;
        Self {
            pending_reply: script.reply.iter().cloned().collect(),
            script,
            log,
            connected: false,
            write_attempts: 0,
        }
    }

    pub fn log(&self) -> SharedLog {
        Rc::clone(&self.log)
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self, endpoint: &Endpoint) -> io::Result<()> {
        self.log.borrow_mut().endpoint = Some(endpoint.clone());
        Ok(())
    }

    fn poll_connect(&mut self) -> ConnectPoll {
        let polls = {
            let mut log = self.log.borrow_mut();
            log.connect_polls += 1;
            log.connect_polls
        };
        if self.script.refuse {
            return ConnectPoll::Failed;
        }
        match self.script.connect_after {
            Some(after) if polls > after => {
                self.connected = true;
                ConnectPoll::Connected
            }
            _ => ConnectPoll::Pending,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> WriteStatus {
        let attempt = self.write_attempts;
        self.write_attempts += 1;
        if !self.connected || self.script.reject_write.is_some_and(|k| attempt >= k) {
            return WriteStatus::Rejected;
        }
        self.log.borrow_mut().writes.push(bytes.to_vec());
        WriteStatus::Accepted
    }

    fn flush(&mut self) -> WriteStatus {
        self.log.borrow_mut().flushes += 1;
        WriteStatus::Accepted
    }

    fn poll_read(&mut self, buf: &mut [u8]) -> ReadPoll {
        self.log.borrow_mut().reads += 1;
        let Some(mut chunk) = self.pending_reply.pop_front() else {
            return if self.script.close_after_reply {
                ReadPoll::Closed
            } else {
                ReadPoll::Pending
            };
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.pending_reply.push_front(chunk.split_off(n));
        }
        ReadPoll::Data(n)
    }

    fn close(&mut self) {
        self.connected = false;
        self.log.borrow_mut().closed = true;
    }
}

/// Hands out [`ScriptedTransport`]s that share one log
pub struct ScriptedConnector {
    script: TransportScript,
    log: SharedLog,
}

impl ScriptedConnector {
    pub fn new(script: TransportScript) -> Self {
        Self {
            script,
            log: SharedLog::default(),
        }
    }

    pub fn log(&self) -> SharedLog {
        Rc::clone(&self.log)
    }

    /// Script used for sessions opened from now on
    pub fn set_script(&mut self, script: TransportScript) {
        self.script = script;
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn open(&mut self) -> ScriptedTransport {
        {
            let mut log = self.log.borrow_mut();
            log.writes.clear();
            log.connect_polls = 0;
            log.flushes = 0;
            log.reads = 0;
            log.closed = false;
        }
        ScriptedTransport::with_log(self.script.clone(), Rc::clone(&self.log))
    }
}
