//! Error types shared across the configuration and request layers.
//!
//! [`ConfigError`] is fatal: it aborts startup before any socket is bound.
//! [`HandlerError`] never leaves the request layer; the dispatcher turns it
//! into an HTTP response carrying the matching status code.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::http::multipart::MultipartError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: unbalanced braces")]
    UnbalancedBraces { line: usize },

    #[error("line {line}: `{keyword}` block is missing its opening brace")]
    MissingBrace { line: usize, keyword: String },

    #[error("line {line}: unknown top-level keyword `{keyword}`")]
    UnknownKeyword { line: usize, keyword: String },

    #[error("line {line}: location blocks cannot be nested")]
    NestedLocation { line: usize },

    #[error("line {line}: location block needs a path prefix")]
    MissingLocationPath { line: usize },

    #[error("line {line}: invalid listen port `{value}` (expected 1-65535)")]
    InvalidPort { line: usize, value: String },

    #[error("line {line}: invalid client_max_body_size `{value}`")]
    InvalidBodySize { line: usize, value: String },

    #[error("line {line}: invalid error_page `{value}` (expected `<code> <path>`)")]
    InvalidErrorPage { line: usize, value: String },

    #[error("line {line}: autoindex must be `on` or `off`, got `{value}`")]
    InvalidAutoindex { line: usize, value: String },
}

/// A request-time failure, already classified by the status it maps to.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),
}

impl HandlerError {
    pub fn status(&self) -> u16 {
        match self {
            HandlerError::BadRequest(_) => 400,
            HandlerError::Forbidden => 403,
            HandlerError::NotFound => 404,
            HandlerError::MethodNotAllowed => 405,
            HandlerError::PayloadTooLarge { .. } => 413,
            HandlerError::NotImplemented(_) => 501,
            HandlerError::Io(_) => 500,
        }
    }
}

impl From<MultipartError> for HandlerError {
    fn from(err: MultipartError) -> Self {
        HandlerError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(HandlerError::BadRequest("x".into()).status(), 400);
        assert_eq!(HandlerError::Forbidden.status(), 403);
        assert_eq!(HandlerError::NotFound.status(), 404);
        assert_eq!(HandlerError::PayloadTooLarge { size: 2, limit: 1 }.status(), 413);
        let io = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(HandlerError::from(io).status(), 500);
    }

    #[test]
    fn multipart_errors_are_bad_requests() {
        let err: HandlerError = MultipartError::MissingFilename.into();
        assert_eq!(err.status(), 400);
    }
}
