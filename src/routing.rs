//! Location selection and URL rewriting, both run ahead of handler dispatch.

use std::borrow::Cow;
use std::path::Path;

use crate::config::{LocationConfig, ServerConfig};

/// Friendly paths mapped onto the pages that back them.
const URL_ALIASES: [(&str, &str); 9] = [
    ("/home", "/index.html"),
    ("/gallery", "/gallery.html"),
    ("/upload", "/upload.html"),
    ("/interactive", "/interactive.html"),
    ("/cookies", "/cookie-demo.html"),
    ("/about", "/about.html"),
    ("/contact", "/contact.html"),
    ("/error", "/error/404.html"),
    ("/help", "/help.html"),
];

/// Picks the location whose prefix is the longest literal prefix of `path`.
///
/// The test is a plain string prefix, so `/images` also covers
/// `/images/cats/cute.jpg` and `/imagesfoo`. Equal-length prefixes keep the
/// first one declared. Without any match the server's own settings act as an
/// implicit `/` location.
pub fn match_location<'a>(path: &str, server: &'a ServerConfig) -> Cow<'a, LocationConfig> {
    let mut best: Option<&LocationConfig> = None;
    for location in &server.locations {
        if !path.starts_with(&location.path) {
            continue;
        }
        if best.is_none_or(|b| location.path.len() > b.path.len()) {
            best = Some(location);
        }
    }
    match best {
        Some(location) => Cow::Borrowed(location),
        None => Cow::Owned(server.implicit_location()),
    }
}

/// Maps a request path onto the file path that should serve it.
///
/// Falls back to the request path when nothing resolves, leaving the 404 to
/// the handler.
pub fn rewrite_url(path: &str, server: &ServerConfig, method: &str) -> String {
    if path == "/" {
        return format!("/{}", server.index);
    }
    if method == "POST" && path == "/upload" {
        return path.to_string();
    }

    let with_slash = format!("{}/", path);
    for candidate in [path, with_slash.as_str()] {
        if let Some((_, target)) = URL_ALIASES.iter().find(|(alias, _)| *alias == candidate) {
            return target.to_string();
        }
    }

    let exists = |p: &str| Path::new(&format!("{}{}", server.root, p)).exists();
    if exists(path) {
        return path.to_string();
    }
    let html = format!("{}.html", path);
    if exists(&html) {
        return html;
    }
    let index = format!("{}/index.html", path.trim_end_matches('/'));
    if exists(&index) {
        return index;
    }
    path.to_string()
}
