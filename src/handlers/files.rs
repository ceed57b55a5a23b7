//! Raw-body writes (PUT) and removals (DELETE) inside the upload directory.
//!
//! Both take the final path segment as the file name and refuse names that
//! could leave the directory before any filesystem call is made.

use std::fs;
use std::path::PathBuf;

use log::info;

use crate::config::{LocationConfig, ServerConfig};
use crate::error::HandlerError;
use crate::handlers::pages;
use crate::http::{HttpRequest, HttpResponse};

/// Used when neither the location nor its server sets `upload_path`.
pub const DEFAULT_UPLOAD_DIR: &str = "www/upload";

pub fn put(
    request: &HttpRequest,
    path: &str,
    location: &LocationConfig,
    server: &ServerConfig,
) -> Result<HttpResponse, HandlerError> {
    let filename = target_filename(path)?;

    let limit = server.body_limit();
    if request.body.len() > limit {
        return Err(HandlerError::PayloadTooLarge { size: request.body.len(), limit });
    }

    let dir = upload_dir(location);
    fs::create_dir_all(&dir)?;
    let target = dir.join(filename);
    fs::write(&target, &request.body)?;
    info!("PUT stored {} ({} bytes)", target.display(), request.body.len());

    Ok(HttpResponse::html(
        201,
        format!("File uploaded successfully: {}", pages::html_escape(filename)),
    ))
}

pub fn delete(
    path: &str,
    location: &LocationConfig,
    server: &ServerConfig,
) -> Result<HttpResponse, HandlerError> {
    let filename = target_filename(path)?;
    let target = upload_dir(location).join(filename);

    if !target.is_file() {
        return Err(HandlerError::NotFound);
    }
    fs::remove_file(&target)?;
    info!("DELETE removed {}", target.display());

    Ok(HttpResponse::html(200, pages::success_page(server, "deleted", filename)))
}

/// Final segment of `path`, rejected when empty or able to escape the
/// upload directory.
pub fn target_filename(path: &str) -> Result<&str, HandlerError> {
    let name = path.rsplit_once('/').map_or(path, |(_, name)| name);
    check_filename(name)?;
    Ok(name)
}

pub fn check_filename(name: &str) -> Result<(), HandlerError> {
    if name.is_empty() {
        return Err(HandlerError::BadRequest("missing file name".to_string()));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(HandlerError::BadRequest(format!("unsafe file name {}", name)));
    }
    Ok(())
}

fn upload_dir(location: &LocationConfig) -> PathBuf {
    if location.upload_path.is_empty() {
        PathBuf::from(DEFAULT_UPLOAD_DIR)
    } else {
        PathBuf::from(&location.upload_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_request(path: &str, body: &[u8]) -> HttpRequest {
        let mut raw = format!("PUT {} HTTP/1.1\r\nContent-Length: {}\r\n\r\n", path, body.len())
            .into_bytes();
        raw.extend_from_slice(body);
        HttpRequest::parse(&raw).unwrap()
    }

    #[test]
    fn filename_guard() {
        assert_eq!(target_filename("/upload/cat.png").unwrap(), "cat.png");
        assert_eq!(target_filename("cat.png").unwrap(), "cat.png");
        assert_eq!(target_filename("/upload/").unwrap_err().status(), 400);
        assert_eq!(target_filename("/upload/..").unwrap_err().status(), 400);
        assert_eq!(check_filename("../../etc/passwd").unwrap_err().status(), 400);
        assert_eq!(check_filename("a\\b").unwrap_err().status(), 400);
    }

    #[test]
    fn put_then_delete_round() {
        let dir = tempfile::tempdir().unwrap();
        let server = ServerConfig::default();
        let location = LocationConfig {
            upload_path: dir.path().join("up").display().to_string(),
            ..LocationConfig::new("/upload")
        };

        let body = [0u8, 1, 2, 3, 0xff, b'\r', b'\n', b'-', b'-', 9];
        let resp = put(&put_request("/upload/cat.png", &body), "/upload/cat.png", &location, &server)
            .unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(fs::read(dir.path().join("up/cat.png")).unwrap(), body);

        let resp = delete("/upload/cat.png", &location, &server).unwrap();
        assert_eq!(resp.status, 200);
        assert!(!dir.path().join("up/cat.png").exists());

        let err = delete("/upload/cat.png", &location, &server).unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn put_over_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = ServerConfig::default();
        server.client_max_body_size = 4;
        let location = LocationConfig {
            upload_path: dir.path().display().to_string(),
            ..LocationConfig::new("/upload")
        };
        let err = put(&put_request("/upload/x", b"12345"), "/upload/x", &location, &server)
            .unwrap_err();
        assert_eq!(err.status(), 413);
        assert!(!dir.path().join("x").exists());
    }
}
