//! Bounded accumulation of the service's reply.
//!
//! A reply is complete when any of these hold:
//! - an HTTP response whose headers are terminated and whose body has reached `Content-Length`
//! - an HTTP response without `Content-Length` whose body contains a closing brace
//! - a bare JSON reply containing a closing brace
//! - the peer closed the connection after at least one byte

const HEADER_END: &[u8] = b"\r\n\r\n";

/// The reply would not fit in the response buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow;

pub struct ReplyBuffer {
    data: Vec<u8>,
    capacity: usize,
    closed: bool,
}

impl ReplyBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            closed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Space left before the buffer overflows
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Append received bytes. A buffer filled to capacity without completing is an overflow.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), Overflow> {
        if bytes.len() > self.remaining() {
            return Err(Overflow);
        }
        self.data.extend_from_slice(bytes);
        if self.remaining() == 0 && !self.is_complete() {
            return Err(Overflow);
        }
        Ok(())
    }

    /// Record that the peer closed the connection
    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    pub fn is_complete(&self) -> bool {
        if self.closed && !self.data.is_empty() {
            return true;
        }
        match self.split_head() {
            Some((head, body)) => match content_length(head) {
                Some(expected) => body.len() >= expected,
                None => body.contains(&b'}'),
            },
            None if self.is_http() => false,
            None => self.data.contains(&b'}'),
        }
    }

    /// HTTP status code when the reply carries a status line
    pub fn status_code(&self) -> Option<u16> {
        if !self.is_http() {
            return None;
        }
        let line_end = find(&self.data, b"\r\n")?;
        let line = std::str::from_utf8(&self.data[..line_end]).ok()?;
        line.split_whitespace().nth(1)?.parse().ok()
    }

    /// Reply body as text: everything after the headers, or the whole reply when it has none
    pub fn body(&self) -> String {
        let body: &[u8] = match self.split_head() {
            Some((_, body)) => body,
            None if self.is_http() => &[],
            None => &self.data[..],
        };
        String::from_utf8_lossy(body).into_owned()
    }

    fn is_http(&self) -> bool {
        self.data.starts_with(b"HTTP/")
    }

    fn split_head(&self) -> Option<(&[u8], &[u8])> {
        if !self.is_http() {
            return None;
        }
        let end = find(&self.data, HEADER_END)?;
        Some((&self.data[..end], &self.data[end + HEADER_END.len()..]))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn content_length(head: &[u8]) -> Option<usize> {
    let head = String::from_utf8_lossy(head);
    head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}
