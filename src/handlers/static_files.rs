use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::LocationConfig;
use crate::error::HandlerError;
use crate::handlers::pages::html_escape;
use crate::http::response::content_type_for;
use crate::http::HttpResponse;

/// What a GET or HEAD on a path resolves to.
enum Resolved {
    File(PathBuf),
    Listing(String),
}

pub fn get(path: &str, location: &LocationConfig) -> Result<HttpResponse, HandlerError> {
    match resolve(path, location)? {
        Resolved::File(file) => {
            let body = fs::read(&file).map_err(access_error)?;
            info!("GET {} -> {} ({} bytes)", path, file.display(), body.len());
            Ok(HttpResponse::new(200, body, content_type_for(&file)))
        }
        Resolved::Listing(html) => {
            info!("GET {} -> directory listing", path);
            Ok(HttpResponse::html(200, html))
        }
    }
}

/// Same resolution as [`get`]; the length comes from file metadata and no
/// body is read.
pub fn head(path: &str, location: &LocationConfig) -> Result<HttpResponse, HandlerError> {
    match resolve(path, location)? {
        Resolved::File(file) => {
            let size = fs::metadata(&file).map_err(access_error)?.len();
            Ok(HttpResponse::head(200, size, content_type_for(&file)))
        }
        Resolved::Listing(html) => Ok(HttpResponse::head(200, html.len() as u64, "text/html")),
    }
}

fn resolve(path: &str, location: &LocationConfig) -> Result<Resolved, HandlerError> {
    let full = PathBuf::from(format!("{}{}", location.root, path));

    if full.is_dir() {
        if location.autoindex() {
            let html = directory_listing(&full, path).map_err(access_error)?;
            return Ok(Resolved::Listing(html));
        }
        let index = full.join(&location.index);
        if index.is_file() {
            return Ok(Resolved::File(index));
        }
        return Err(HandlerError::Forbidden);
    }

    if full.is_file() {
        Ok(Resolved::File(full))
    } else {
        Err(HandlerError::NotFound)
    }
}

/// Sorted listing of `dir`, linked relative to `url_path`.
pub fn directory_listing(dir: &Path, url_path: &str) -> io::Result<String> {
    let mut entries: Vec<(String, bool)> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            (entry.file_name().to_string_lossy().into_owned(), is_dir)
        })
        .collect();
    entries.sort();

    let base = if url_path.ends_with('/') {
        url_path.to_string()
    } else {
        format!("{}/", url_path)
    };
    let title = html_escape(url_path);

    let mut html = format!(
        "<!DOCTYPE html>\n<html><head><title>Directory: {title}</title></head>\n\
         <body><h1>Directory listing for {title}</h1>\n<ul>\n"
    );
    if url_path != "/" {
        html.push_str(&format!("<li><a href=\"{}../\">../</a></li>\n", html_escape(&base)));
    }
    for (name, is_dir) in entries {
        let suffix = if is_dir { "/" } else { "" };
        let name = html_escape(&name);
        html.push_str(&format!(
            "<li><a href=\"{}{}{}\">{}{}</a></li>\n",
            html_escape(&base),
            name,
            suffix,
            name,
            suffix
        ));
    }
    html.push_str("</ul></body></html>\n");
    Ok(html)
}

fn access_error(err: io::Error) -> HandlerError {
    match err.kind() {
        io::ErrorKind::NotFound => HandlerError::NotFound,
        io::ErrorKind::PermissionDenied => HandlerError::Forbidden,
        _ => HandlerError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(root: &Path, autoindex: bool) -> LocationConfig {
        LocationConfig {
            path: "/".into(),
            root: root.display().to_string(),
            index: "index.html".into(),
            autoindex: Some(autoindex),
            ..LocationConfig::default()
        }
    }

    #[test]
    fn serves_file_with_content_type() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("style.css"), "body{}").unwrap();
        let resp = get("/style.css", &location(dir.path(), false)).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, "text/css");
        assert_eq!(resp.body, b"body{}");
    }

    #[test]
    fn directory_without_autoindex_uses_index_or_forbids() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        let loc = location(dir.path(), false);
        assert!(matches!(get("/docs", &loc), Err(HandlerError::Forbidden)));

        fs::write(dir.path().join("docs/index.html"), "<p>docs</p>").unwrap();
        let resp = get("/docs", &loc).unwrap();
        assert_eq!(resp.body, b"<p>docs</p>");
    }

    #[test]
    fn autoindex_lists_sorted_entries_with_parent_link() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pics/sub")).unwrap();
        fs::write(dir.path().join("pics/b.png"), "b").unwrap();
        fs::write(dir.path().join("pics/a.png"), "a").unwrap();

        let resp = get("/pics", &location(dir.path(), true)).unwrap();
        let html = String::from_utf8(resp.body).unwrap();
        let a = html.find("/pics/a.png").unwrap();
        let b = html.find("/pics/b.png").unwrap();
        assert!(a < b);
        assert!(html.contains("href=\"/pics/sub/\""));
        assert!(html.contains("href=\"/pics/../\""));
    }

    #[test]
    fn root_listing_has_no_parent_link() {
        let dir = tempfile::tempdir().unwrap();
        let html = directory_listing(dir.path(), "/").unwrap();
        assert!(!html.contains("../"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(dir.path(), false);
        assert!(matches!(get("/nope.txt", &loc), Err(HandlerError::NotFound)));
        assert!(matches!(head("/nope.txt", &loc), Err(HandlerError::NotFound)));
    }

    #[test]
    fn head_reports_file_size_without_body() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.bin"), vec![7u8; 4096]).unwrap();
        let resp = head("/data.bin", &location(dir.path(), false)).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_length(), 4096);
        assert!(resp.body.is_empty());
        assert_eq!(resp.content_type, "application/octet-stream");
    }
}
