use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::ServerConfig;
use crate::http::response::reason_phrase;
use crate::http::HttpResponse;

/// Body for an error status: the configured page when it is readable,
/// otherwise a generic page naming the code and reason.
pub fn error_page_body(code: u16, server: &ServerConfig) -> String {
    if let Some(page) = server.error_pages.get(&code) {
        let path = under_root(&server.root, page);
        match fs::read_to_string(&path) {
            Ok(content) => return content,
            Err(e) => debug!("error page {} unreadable: {}", path.display(), e),
        }
    }
    format!(
        "<html><body><h1>{} - {}</h1></body></html>",
        code,
        reason_phrase(code)
    )
}

pub fn error_response(code: u16, server: &ServerConfig, head_only: bool) -> HttpResponse {
    if head_only {
        return HttpResponse::head(code, 0, "text/html");
    }
    HttpResponse::html(code, error_page_body(code, server))
}

/// Confirmation page for an upload or deletion, from
/// `<root>/templates/success.html` when present.
pub fn success_page(server: &ServerConfig, action: &str, filename: &str) -> String {
    let template = Path::new(&server.root).join("templates/success.html");
    match fs::read_to_string(&template) {
        Ok(content) => render_template(&content, action, &html_escape(filename)),
        Err(_) => {
            debug!("no success template at {}, using inline page", template.display());
            fallback_success_page(action, &html_escape(filename))
        }
    }
}

pub fn render_template(template: &str, action: &str, filename: &str) -> String {
    template
        .replace("{{action}}", action)
        .replace("{{filename}}", filename)
}

pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn fallback_success_page(action: &str, filename: &str) -> String {
    let title = if action == "deleted" { "File Deleted" } else { "Upload Successful" };
    format!(
        "<!DOCTYPE html>\n\
         <html><head><title>{title}</title><link rel=\"stylesheet\" href=\"/style.css\"></head>\n\
         <body><div class=\"container text-center\">\n\
         <h1>{title}</h1>\n\
         <p>File <strong>{filename}</strong> {action} successfully.</p>\n\
         <div class=\"nav-buttons\"><a href=\"/upload\" class=\"nav-btn\">Upload Another</a> \
         <a href=\"/\" class=\"nav-btn\">Go Home</a></div>\n\
         </div></body></html>\n"
    )
}

fn under_root(root: &str, page: &str) -> PathBuf {
    Path::new(root).join(page.trim_start_matches('/'))
}
