use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use log::debug;
use mio::net::TcpStream;

use crate::http::HttpRequest;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Reading,
    Writing,
}

/// Where a read pass left the connection.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadStatus {
    Pending,
    /// A whole request is buffered.
    Ready,
    /// The buffer passed its cap before the request completed.
    Oversized,
    /// The head cap was reached without the blank line ending the head.
    HeadTooLarge,
    /// Peer hung up or the socket failed.
    Closed,
}

#[derive(Debug)]
pub enum WriteStatus {
    Pending,
    Done,
    Failed(io::Error),
}

/// One accepted client. Holds only an index into the server list, never the
/// configuration itself.
pub struct Connection {
    pub stream: TcpStream,
    pub phase: Phase,
    pub server_idx: usize,
    inbound: Vec<u8>,
    outbound: Vec<u8>,
    sent: usize,
    last_activity: Instant,
}

impl Connection {
    pub fn new(stream: TcpStream, server_idx: usize) -> Self {
        Self {
            stream,
            phase: Phase::Reading,
            server_idx,
            inbound: Vec::with_capacity(READ_CHUNK * 2),
            outbound: Vec::new(),
            sent: 0,
            last_activity: Instant::now(),
        }
    }

    /// Drains the socket into the request buffer until it would block, the
    /// request is complete, or one of the caps is passed.
    pub fn read_request(&mut self, cap: usize, head_cap: usize) -> ReadStatus {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return ReadStatus::Closed,
                Ok(n) => {
                    self.inbound.extend_from_slice(&chunk[..n]);
                    self.touch();
                    if let Some(status) = buffered_status(&self.inbound, cap, head_cap) {
                        return status;
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return ReadStatus::Pending,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("[Network] Read failed: {}", e);
                    return ReadStatus::Closed;
                }
            }
        }
    }

    pub fn request_bytes(&self) -> &[u8] {
        &self.inbound
    }

    pub fn respond(&mut self, bytes: Vec<u8>) {
        self.outbound = bytes;
        self.sent = 0;
        self.phase = Phase::Writing;
        self.touch();
    }

    /// Writes as much of the queued response as the socket accepts.
    pub fn flush(&mut self) -> WriteStatus {
        while self.sent < self.outbound.len() {
            match self.stream.write(&self.outbound[self.sent..]) {
                Ok(0) => return WriteStatus::Failed(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.sent += n;
                    self.touch();
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return WriteStatus::Pending,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return WriteStatus::Failed(e),
            }
        }
        WriteStatus::Done
    }

    /// Bytes sent so far and bytes queued in total.
    pub fn progress(&self) -> (usize, usize) {
        (self.sent, self.outbound.len())
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.duration_since(self.last_activity) > timeout
    }
}

/// Verdict on a request buffer, `None` while more bytes are welcome.
pub fn buffered_status(buf: &[u8], cap: usize, head_cap: usize) -> Option<ReadStatus> {
    if HttpRequest::is_complete(buf) {
        return Some(ReadStatus::Ready);
    }
    if buf.len() >= head_cap && !HttpRequest::has_head(buf) {
        return Some(ReadStatus::HeadTooLarge);
    }
    if buf.len() > cap {
        return Some(ReadStatus::Oversized);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD_CAP: usize = 64;

    #[test]
    fn complete_request_is_ready() {
        let buf = b"PUT /a HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
        assert_eq!(buffered_status(buf, 1024, HEAD_CAP), Some(ReadStatus::Ready));
        assert_eq!(buffered_status(&buf[..buf.len() - 1], 1024, HEAD_CAP), None);
    }

    #[test]
    fn endless_head_is_cut_at_the_head_cap() {
        let mut buf = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        buf.resize(HEAD_CAP - 1, b'a');
        assert_eq!(buffered_status(&buf, 1 << 20, HEAD_CAP), None);
        buf.push(b'a');
        assert_eq!(buffered_status(&buf, 1 << 20, HEAD_CAP), Some(ReadStatus::HeadTooLarge));
    }

    #[test]
    fn large_body_is_allowed_past_the_head_cap() {
        let mut buf = b"PUT /a HTTP/1.1\r\nContent-Length: 500\r\n\r\n".to_vec();
        buf.resize(buf.len() + 200, b'x');
        assert!(buf.len() > HEAD_CAP);
        assert_eq!(buffered_status(&buf, 1024, HEAD_CAP), None);
    }

    #[test]
    fn body_past_the_cap_is_oversized() {
        let mut buf = b"PUT /a HTTP/1.1\r\nContent-Length: 5000\r\n\r\n".to_vec();
        buf.resize(1025, b'x');
        assert_eq!(buffered_status(&buf, 1024, HEAD_CAP), Some(ReadStatus::Oversized));
    }
}
