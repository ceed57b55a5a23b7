use std::path::Path;

pub const SERVER_NAME: &str = "webserv";

/// A response ready for serialization.
///
/// `content_length` overrides the body length; HEAD responses use it to
/// announce a size while carrying no body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>, content_type: &str) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            content_length: None,
            body: body.into(),
        }
    }

    pub fn html(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, body, "text/html")
    }

    /// Headers only: `Content-Length` is announced, nothing follows.
    pub fn head(status: u16, content_length: u64, content_type: &str) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            content_length: Some(content_length),
            body: Vec::new(),
        }
    }

    pub fn content_length(&self) -> u64 {
        self.content_length.unwrap_or(self.body.len() as u64)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self.content_length {
            None => build(self.status, &self.body, &self.content_type),
            Some(len) => {
                let header = build_header(self.status, len, &self.content_type);
                [header.as_bytes(), &self.body[..]].concat()
            }
        }
    }
}

/// Status line plus headers, terminated by the blank line.
pub fn build_header(code: u16, content_length: u64, content_type: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Server: {}\r\n\
         Connection: close\r\n\r\n",
        code,
        reason_phrase(code),
        content_type,
        content_length,
        SERVER_NAME
    )
}

pub fn build(code: u16, body: &[u8], content_type: &str) -> Vec<u8> {
    let header = build_header(code, body.len() as u64, content_type);
    [header.as_bytes(), body].concat()
}

pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        411 => "Length Required",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => "Unknown",
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
