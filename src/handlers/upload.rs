use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::{LocationConfig, ServerConfig};
use crate::error::HandlerError;
use crate::handlers::{cgi, files, pages};
use crate::http::multipart;
use crate::http::{HttpRequest, HttpResponse};

pub fn post(
    request: &HttpRequest,
    path: &str,
    location: &LocationConfig,
    server: &ServerConfig,
) -> Result<HttpResponse, HandlerError> {
    if path.starts_with("/upload") {
        return save_multipart(request, location, server);
    }
    if path.starts_with("/cgi-bin/") {
        return Ok(cgi::simulate(request, path, server));
    }
    Ok(HttpResponse::html(
        200,
        format!("POST request received for: {}", pages::html_escape(path)),
    ))
}

/// Writes the file carried by a multipart body into the upload directory.
/// The size check runs before anything touches the disk.
fn save_multipart(
    request: &HttpRequest,
    location: &LocationConfig,
    server: &ServerConfig,
) -> Result<HttpResponse, HandlerError> {
    let content_type = request.header("content-type").unwrap_or("");
    if !content_type.to_ascii_lowercase().starts_with("multipart/form-data") {
        return Err(HandlerError::BadRequest(format!(
            "upload needs multipart/form-data, got `{}`",
            content_type
        )));
    }
    let part = multipart::extract(&request.raw)?;
    files::check_filename(&part.filename)?;

    let limit = server.body_limit();
    if part.len() > limit {
        return Err(HandlerError::PayloadTooLarge { size: part.len(), limit });
    }

    let dir = upload_dir(location, server);
    fs::create_dir_all(&dir)?;
    let target = dir.join(&part.filename);
    fs::write(&target, part.content(&request.raw))?;
    info!("Upload saved to {} ({} bytes)", target.display(), part.len());

    Ok(HttpResponse::html(
        200,
        pages::success_page(server, "uploaded", &part.filename),
    ))
}

/// The location's `upload_path`, or `<root>/upload` when none is configured.
fn upload_dir(location: &LocationConfig, server: &ServerConfig) -> PathBuf {
    if location.upload_path.is_empty() {
        Path::new(&server.root).join("upload")
    } else {
        PathBuf::from(&location.upload_path)
    }
}
