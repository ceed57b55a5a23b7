use std::collections::HashMap;

/// A fully buffered request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub version: String,
    /// Keyed by lower-cased header name.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    /// The whole request as received, head included, for multipart scanning.
    pub raw: Vec<u8>,
}

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

impl HttpRequest {
    /// Parses a buffered request. Returns `None` until the head and the full
    /// `Content-Length` body are present, or when the head is malformed.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let (head_len, total_len) = framing(buf)?;
        if buf.len() < total_len {
            return None;
        }

        let head = std::str::from_utf8(&buf[..head_len]).ok()?;
        let mut lines = head.split("\r\n");

        let mut request_line = lines.next()?.split_whitespace();
        let method = request_line.next()?;
        let target = request_line.next()?;
        let version = request_line.next().unwrap_or("HTTP/1.1");
        let (path, query) = target.split_once('?').unwrap_or((target, ""));

        let headers = lines
            .take_while(|line| !line.is_empty())
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();

        Some(Self {
            method: method.to_string(),
            path: path.to_string(),
            query: query.to_string(),
            version: version.to_string(),
            headers,
            body: buf[head_len..total_len].to_vec(),
            raw: buf[..total_len].to_vec(),
        })
    }

    /// True once `buf` holds the head and every body byte it announces.
    pub fn is_complete(buf: &[u8]) -> bool {
        framing(buf).is_some_and(|(_, total_len)| buf.len() >= total_len)
    }

    /// True once the blank line ending the head has arrived.
    pub fn has_head(buf: &[u8]) -> bool {
        framing(buf).is_some()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Length of the head (terminator included) and of head plus declared body.
fn framing(buf: &[u8]) -> Option<(usize, usize)> {
    let head_len = buf
        .windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)?
        + HEAD_TERMINATOR.len();
    let body_len = declared_length(&buf[..head_len]).unwrap_or(0);
    Some((head_len, head_len.saturating_add(body_len)))
}

fn declared_length(head: &[u8]) -> Option<usize> {
    std::str::from_utf8(head)
        .ok()?
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}
