//! Locating an uploaded file inside a raw `multipart/form-data` request.
//!
//! Everything here is offset arithmetic over an immutable byte slice; the
//! file bytes are never copied or decoded, so binary payloads survive intact.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("no filename=\"...\" marker in request")]
    MissingFilename,

    #[error("filename is empty")]
    EmptyFilename,

    #[error("no Content-Type header after the filename")]
    MissingContentType,

    #[error("part headers are not terminated by a blank line")]
    MissingHeaderTerminator,

    #[error("boundary parameter is missing or empty")]
    EmptyBoundary,

    #[error("closing boundary not found")]
    MissingClosingBoundary,

    #[error("invalid content range {start}..{end}")]
    InvalidRange { start: usize, end: usize },
}

/// The byte range `start..end` of one uploaded file within the raw request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub start: usize,
    pub end: usize,
}

impl FilePart {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn content<'a>(&self, raw: &'a [u8]) -> &'a [u8] {
        &raw[self.start..self.end]
    }
}

const FILENAME_MARKER: &[u8] = b"filename=\"";
const CONTENT_TYPE_HEADER: &[u8] = b"content-type:";
const BOUNDARY_PARAM: &[u8] = b"boundary=";

pub fn extract(raw: &[u8]) -> Result<FilePart, MultipartError> {
    let marker = find_bytes(raw, FILENAME_MARKER, 0).ok_or(MultipartError::MissingFilename)?;
    let name_start = marker + FILENAME_MARKER.len();
    let name_end = find_bytes(raw, b"\"", name_start).ok_or(MultipartError::MissingFilename)?;
    if name_end == name_start {
        return Err(MultipartError::EmptyFilename);
    }
    let filename = String::from_utf8_lossy(&raw[name_start..name_end]).into_owned();

    let content_type = find_bytes_ignore_case(raw, CONTENT_TYPE_HEADER, name_end)
        .ok_or(MultipartError::MissingContentType)?;
    let separator = find_bytes(raw, b"\r\n\r\n", content_type)
        .ok_or(MultipartError::MissingHeaderTerminator)?;
    let start = separator + 4;

    let boundary = extract_boundary(raw)
        .filter(|b| !b.is_empty())
        .ok_or(MultipartError::EmptyBoundary)?;
    let delimiter = [&b"--"[..], boundary].concat();

    let mut end =
        find_bytes(raw, &delimiter, start).ok_or(MultipartError::MissingClosingBoundary)?;
    if end >= start + 2 && &raw[end - 2..end] == b"\r\n" {
        end -= 2;
    }
    if end <= start {
        return Err(MultipartError::InvalidRange { start, end });
    }

    Ok(FilePart { filename, start, end })
}

/// Reads the `boundary=` parameter, quoted or bare.
pub fn extract_boundary(raw: &[u8]) -> Option<&[u8]> {
    let pos = find_bytes(raw, BOUNDARY_PARAM, 0)?;
    let value = &raw[pos + BOUNDARY_PARAM.len()..];
    if let Some(quoted) = value.strip_prefix(b"\"") {
        let close = quoted.iter().position(|&b| b == b'"')?;
        return Some(&quoted[..close]);
    }
    let stop = value
        .iter()
        .position(|&b| matches!(b, b' ' | b'\r' | b'\n' | b';'))
        .unwrap_or(value.len());
    Some(&value[..stop])
}

pub fn find_bytes(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .get(start..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + start)
}

fn find_bytes_ignore_case(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    haystack
        .get(start..)?
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|pos| pos + start)
}
