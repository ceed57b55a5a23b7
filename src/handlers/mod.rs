//! Per-method request handling.
//!
//! [`handle`] is the single entry point used by the connection layer: it
//! rewrites the path, picks the location policy, dispatches on the method
//! and turns every [`HandlerError`] into an error-page response.

pub mod cgi;
pub mod files;
pub mod pages;
pub mod static_files;
pub mod upload;

use std::fmt;
use std::str::FromStr;

use log::{debug, error, warn};

use crate::config::ServerConfig;
use crate::error::HandlerError;
use crate::http::{HttpRequest, HttpResponse};
use crate::routing::{match_location, rewrite_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(HandlerError::NotImplemented(format!("method {}", other))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn handle(request: &HttpRequest, server: &ServerConfig) -> HttpResponse {
    let method = request.method.parse::<Method>();
    let head_only = matches!(method, Ok(Method::Head));
    let outcome = method.and_then(|method| route(method, request, server));

    match outcome {
        Ok(response) => response,
        Err(err) => {
            let status = err.status();
            if status >= 500 {
                error!("{} {} -> {}: {}", request.method, request.path, status, err);
            } else {
                warn!("{} {} -> {}: {}", request.method, request.path, status, err);
            }
            pages::error_response(status, server, head_only)
        }
    }
}

fn route(
    method: Method,
    request: &HttpRequest,
    server: &ServerConfig,
) -> Result<HttpResponse, HandlerError> {
    if !request.path.starts_with('/') {
        return Err(HandlerError::BadRequest(format!(
            "request target {} is not an absolute path",
            request.path
        )));
    }
    if request.path.split('/').any(|segment| segment == "..") {
        return Err(HandlerError::BadRequest(format!(
            "parent segment in path {}",
            request.path
        )));
    }

    let path = rewrite_url(&request.path, server, method.as_str());
    let location = match_location(&path, server);
    debug!(
        "{} {} rewritten to {} under location {}",
        method, request.path, path, location.path
    );

    if !location.allows(method.as_str()) {
        return Err(HandlerError::MethodNotAllowed);
    }

    match method {
        Method::Get => static_files::get(&path, &location),
        Method::Head => static_files::head(&path, &location),
        Method::Post => upload::post(request, &path, &location, server),
        Method::Put => files::put(request, &path, &location, server),
        Method::Delete => files::delete(&path, &location, server),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_methods_only() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        let err = "PATCH".parse::<Method>().unwrap_err();
        assert_eq!(err.status(), 501);
        assert!("get".parse::<Method>().is_err());
    }

    #[test]
    fn relative_targets_are_bad_requests() {
        let server = ServerConfig::default();
        for target in ["-secret/key.txt", "index.html", "*"] {
            let raw = format!("GET {} HTTP/1.1\r\n\r\n", target);
            let request = HttpRequest::parse(raw.as_bytes()).unwrap();
            let err = route(Method::Get, &request, &server).unwrap_err();
            assert_eq!(err.status(), 400, "{}", target);
        }
    }
}
