use log::info;

use crate::config::ServerConfig;
use crate::handlers::pages::html_escape;
use crate::http::{HttpRequest, HttpResponse};

/// Describes a `/cgi-bin/` request instead of running a script: no
/// subprocess is spawned, the page just echoes what a script would receive.
pub fn simulate(request: &HttpRequest, script: &str, server: &ServerConfig) -> HttpResponse {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html><head><title>CGI Response</title></head>\n<body>\n\
         <h1>CGI Script Execution</h1>\n",
    );
    html.push_str(&format!("<p><strong>Script:</strong> {}</p>\n", html_escape(script)));
    html.push_str(&format!("<p><strong>Method:</strong> {}</p>\n", html_escape(&request.method)));
    if !request.query.is_empty() {
        html.push_str(&format!("<p><strong>Query:</strong> {}</p>\n", html_escape(&request.query)));
    }
    if !request.body.is_empty() {
        html.push_str(&format!(
            "<p><strong>Body Size:</strong> {} bytes</p>\n",
            request.body.len()
        ));
    }
    html.push_str(&format!(
        "<p><strong>Server:</strong> {}</p>\n",
        html_escape(&server.server_name)
    ));
    html.push_str("<p><em>CGI output is simulated.</em></p>\n</body></html>\n");

    info!("CGI {} simulated for {} ({} body bytes)", script, request.method, request.body.len());
    HttpResponse::html(200, html)
}
