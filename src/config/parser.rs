use crate::config::models::{
    LocationConfig, ServerConfig, DEFAULT_ERROR_PAGES, DEFAULT_INDEX, DEFAULT_PORT, DEFAULT_ROOT,
};
use crate::config::normalize::normalize;
use crate::error::ConfigError;
use log::{debug, info};
use std::fs;
use std::path::Path;

#[derive(PartialEq)]
enum ParseMode {
    TopLevel,
    Server,
    Location,
}

pub fn parse_config<P: AsRef<Path>>(path: P) -> Result<Vec<ServerConfig>, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let servers = parse_config_str(&content)?;
    info!("Loaded {} server block(s) from {}", servers.len(), path.display());
    Ok(servers)
}

pub fn parse_config_str(content: &str) -> Result<Vec<ServerConfig>, ConfigError> {
    let mut servers = Vec::new();
    let mut current_server: Option<ServerConfig> = None;
    let mut current_location: Option<LocationConfig> = None;
    let mut mode = ParseMode::TopLevel;
    let mut line_no = 0;

    for (idx, raw_line) in content.lines().enumerate() {
        line_no = idx + 1;
        let line = normalize(raw_line);
        if line.is_empty() {
            continue;
        }

        match mode {
            ParseMode::TopLevel => {
                if line == "}" {
                    return Err(ConfigError::UnbalancedBraces { line: line_no });
                }
                let (keyword, arg) = match block_opener(&line) {
                    Some(opener) => opener,
                    None => {
                        let (key, _) = split_directive(&line);
                        return Err(missing_brace_or_unknown(key, line_no));
                    }
                };
                if keyword != "server" {
                    return Err(ConfigError::UnknownKeyword {
                        line: line_no,
                        keyword: keyword.to_string(),
                    });
                }
                if !arg.is_empty() {
                    return Err(ConfigError::MissingBrace {
                        line: line_no,
                        keyword: "server".to_string(),
                    });
                }
                current_server = Some(ServerConfig::default());
                mode = ParseMode::Server;
            }

            ParseMode::Server => {
                let server = match current_server.as_mut() {
                    Some(s) => s,
                    None => return Err(ConfigError::UnbalancedBraces { line: line_no }),
                };
                if line == "}" {
                    let mut finished = current_server.take().unwrap_or_default();
                    finalize_server(&mut finished);
                    servers.push(finished);
                    mode = ParseMode::TopLevel;
                    continue;
                }
                if let Some((keyword, arg)) = block_opener(&line) {
                    if keyword != "location" {
                        return Err(ConfigError::UnbalancedBraces { line: line_no });
                    }
                    if arg.is_empty() {
                        return Err(ConfigError::MissingLocationPath { line: line_no });
                    }
                    current_location = Some(LocationConfig::new(arg));
                    mode = ParseMode::Location;
                    continue;
                }
                let (key, value) = split_directive(&line);
                match key {
                    "location" => {
                        return Err(ConfigError::MissingBrace {
                            line: line_no,
                            keyword: "location".to_string(),
                        });
                    }
                    "server" => return Err(ConfigError::UnbalancedBraces { line: line_no }),
                    _ => apply_server_directive(server, key, &value, line_no)?,
                }
            }

            ParseMode::Location => {
                let location = match current_location.as_mut() {
                    Some(l) => l,
                    None => return Err(ConfigError::UnbalancedBraces { line: line_no }),
                };
                if line == "}" {
                    if let (Some(server), Some(location)) =
                        (current_server.as_mut(), current_location.take())
                    {
                        server.locations.push(location);
                    }
                    mode = ParseMode::Server;
                    continue;
                }
                if let Some((keyword, _)) = block_opener(&line) {
                    if keyword == "location" {
                        return Err(ConfigError::NestedLocation { line: line_no });
                    }
                    return Err(ConfigError::UnbalancedBraces { line: line_no });
                }
                let (key, value) = split_directive(&line);
                match key {
                    "location" => return Err(ConfigError::NestedLocation { line: line_no }),
                    "server" => return Err(ConfigError::UnbalancedBraces { line: line_no }),
                    _ => apply_location_directive(location, key, &value, line_no)?,
                }
            }
        }
    }

    if mode != ParseMode::TopLevel {
        return Err(ConfigError::UnbalancedBraces { line: line_no });
    }

    Ok(servers)
}

/// Fills every field a server block left unset.
pub fn apply_defaults(server: &mut ServerConfig) {
    if server.root.is_empty() {
        server.root = DEFAULT_ROOT.to_string();
    }
    if server.index.is_empty() {
        server.index = DEFAULT_INDEX.to_string();
    }
    if server.ports.is_empty() {
        server.ports.push(DEFAULT_PORT);
    }
    for (code, page) in DEFAULT_ERROR_PAGES {
        server.error_pages.entry(code).or_insert_with(|| page.to_string());
    }
}

/// Copies server values into the fields `location` left unset.
/// Values set explicitly inside the location block are never touched.
pub fn apply_inheritance(location: &mut LocationConfig, server: &ServerConfig) {
    if location.root.is_empty() {
        location.root = server.root.clone();
    }
    if location.index.is_empty() {
        location.index = server.index.clone();
    }
    if location.autoindex.is_none() {
        location.autoindex = Some(server.autoindex);
    }
    if location.upload_path.is_empty() {
        location.upload_path = server.upload_path.clone();
    }
}

fn finalize_server(server: &mut ServerConfig) {
    apply_defaults(server);
    let resolved = server.clone();
    for location in &mut server.locations {
        apply_inheritance(location, &resolved);
    }
    debug!(
        "Server `{}` resolved with {} location(s)",
        server.server_name,
        server.locations.len()
    );
}

fn apply_server_directive(
    server: &mut ServerConfig,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), ConfigError> {
    server.raw.entry(key.to_string()).or_default().push(value.to_string());
    match key {
        "listen" => {
            server.listen_entries.push(value.to_string());
            let port_part = match value.rsplit_once(':') {
                Some((host, port)) => {
                    if !host.is_empty() {
                        server.host = host.to_string();
                    }
                    port
                }
                None => value,
            };
            let port = parse_port(port_part).ok_or_else(|| ConfigError::InvalidPort {
                line,
                value: value.to_string(),
            })?;
            if !server.ports.contains(&port) {
                server.ports.push(port);
            }
        }
        "host" => server.host = value.to_string(),
        "server_name" => server.server_name = value.to_string(),
        "root" => server.root = value.to_string(),
        "index" => server.index = first_word(value),
        "autoindex" => server.autoindex = parse_switch(value, line)?,
        "upload_path" => server.upload_path = value.to_string(),
        "client_max_body_size" => {
            server.client_max_body_size =
                parse_body_size(value).ok_or_else(|| ConfigError::InvalidBodySize {
                    line,
                    value: value.to_string(),
                })?;
        }
        "error_page" => {
            let invalid = || ConfigError::InvalidErrorPage {
                line,
                value: value.to_string(),
            };
            let parts: Vec<&str> = value.split_whitespace().collect();
            let (page, codes) = parts.split_last().ok_or_else(invalid)?;
            if codes.is_empty() {
                return Err(invalid());
            }
            for code in codes {
                let code = code
                    .parse::<u16>()
                    .ok()
                    .filter(|c| (100..=599).contains(c))
                    .ok_or_else(invalid)?;
                server.error_pages.insert(code, page.to_string());
            }
        }
        _ => debug!("line {}: keeping server directive `{}` as raw", line, key),
    }
    Ok(())
}

fn apply_location_directive(
    location: &mut LocationConfig,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), ConfigError> {
    location.raw.entry(key.to_string()).or_default().push(value.to_string());
    match key {
        "root" => location.root = value.to_string(),
        "index" => location.index = first_word(value),
        "autoindex" => location.autoindex = Some(parse_switch(value, line)?),
        "upload_path" => location.upload_path = value.to_string(),
        "allow_methods" | "methods" => {
            location.methods = value
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|m| !m.is_empty())
                .map(str::to_ascii_uppercase)
                .collect();
        }
        _ => debug!(
            "line {}: keeping location directive `{}` as raw for {}",
            line, key, location.path
        ),
    }
    Ok(())
}

/// Recognises `keyword [arg] {` and returns `(keyword, arg)`.
fn block_opener(line: &str) -> Option<(&str, &str)> {
    let head = line.strip_suffix('{')?.trim();
    Some(match head.split_once(char::is_whitespace) {
        Some((keyword, arg)) => (keyword, arg.trim()),
        None => (head, ""),
    })
}

fn split_directive(line: &str) -> (&str, String) {
    match line.split_once(char::is_whitespace) {
        Some((key, value)) => (key, normalize(value)),
        None => (line, String::new()),
    }
}

fn missing_brace_or_unknown(keyword: &str, line: usize) -> ConfigError {
    if keyword == "server" || keyword == "location" {
        ConfigError::MissingBrace {
            line,
            keyword: keyword.to_string(),
        }
    } else {
        ConfigError::UnknownKeyword {
            line,
            keyword: keyword.to_string(),
        }
    }
}

fn parse_port(value: &str) -> Option<u16> {
    value.trim().parse::<u16>().ok().filter(|p| *p != 0)
}

fn parse_switch(value: &str, line: usize) -> Result<bool, ConfigError> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(ConfigError::InvalidAutoindex {
            line,
            value: value.to_string(),
        }),
    }
}

/// Plain byte counts, or a `K`/`M`/`G` suffix in powers of 1024.
fn parse_body_size(value: &str) -> Option<usize> {
    let value = value.trim();
    let (digits, multiplier) = match value.chars().last()? {
        'k' | 'K' => (&value[..value.len() - 1], 1024),
        'm' | 'M' => (&value[..value.len() - 1], 1024 * 1024),
        'g' | 'G' => (&value[..value.len() - 1], 1024 * 1024 * 1024),
        _ => (value, 1),
    };
    digits.parse::<usize>().ok()?.checked_mul(multiplier)
}

fn first_word(value: &str) -> String {
    value.split_whitespace().next().unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# sample configuration
server {
    listen 127.0.0.1:8080;
    listen 8081;
    listen 8080;          // duplicate port is folded
    server_name example;
    root www;
    index home.html;
    client_max_body_size 2M;
    error_page 404 errors/not_found.html;

    location / {
        autoindex off;
    }

    location /images {
        root media;
        autoindex on;
    }

    location /upload {
        upload_path www/upload;
        allow_methods GET put, DELETE;
        cgi_extension .py;
    }
}

server {
    listen 9090;
}
"#;

    #[test]
    fn parses_server_fields() {
        let servers = parse_config_str(SAMPLE).unwrap();
        assert_eq!(servers.len(), 2);
        let s = &servers[0];
        assert_eq!(s.host, "127.0.0.1");
        assert_eq!(s.ports, vec![8080, 8081]);
        assert_eq!(s.listen_entries, vec!["127.0.0.1:8080", "8081", "8080"]);
        assert_eq!(s.server_name, "example");
        assert_eq!(s.root, "www");
        assert_eq!(s.index, "home.html");
        assert_eq!(s.client_max_body_size, 2 * 1024 * 1024);
        assert_eq!(s.error_pages[&404], "errors/not_found.html");
        assert_eq!(s.raw["listen"].len(), 3);
    }

    #[test]
    fn applies_defaults_to_bare_server() {
        let servers = parse_config_str(SAMPLE).unwrap();
        let s = &servers[1];
        assert_eq!(s.root, DEFAULT_ROOT);
        assert_eq!(s.index, DEFAULT_INDEX);
        assert_eq!(s.ports, vec![9090]);
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.error_pages[&403], "error/403.html");
        assert_eq!(s.body_limit(), crate::config::DEFAULT_MAX_BODY_SIZE);

        let empty = parse_config_str("server {\n}\n").unwrap();
        assert_eq!(empty[0].ports, vec![DEFAULT_PORT]);
    }

    #[test]
    fn locations_inherit_unset_fields_only() {
        let servers = parse_config_str(SAMPLE).unwrap();
        let locations = &servers[0].locations;
        assert_eq!(locations.len(), 3);

        assert_eq!(locations[0].path, "/");
        assert_eq!(locations[0].root, "www");
        assert_eq!(locations[0].index, "home.html");
        assert!(!locations[0].autoindex());

        assert_eq!(locations[1].root, "media");
        assert!(locations[1].autoindex());

        assert_eq!(locations[2].upload_path, "www/upload");
        assert_eq!(locations[2].methods, vec!["GET", "PUT", "DELETE"]);
        assert_eq!(locations[2].raw["cgi_extension"], vec![".py"]);
    }

    #[test]
    fn inheritance_sees_directives_after_location_block() {
        let text = "server {\n location /a {\n }\n root late;\n autoindex on;\n}\n";
        let servers = parse_config_str(text).unwrap();
        assert_eq!(servers[0].locations[0].root, "late");
        assert!(servers[0].locations[0].autoindex());
    }

    #[test]
    fn apply_inheritance_keeps_explicit_values() {
        let mut server = ServerConfig::default();
        server.root = "srv".into();
        server.index = "i.html".into();
        server.autoindex = true;
        let mut location = LocationConfig::new("/x");
        location.root = "mine".into();
        location.autoindex = Some(false);
        apply_inheritance(&mut location, &server);
        assert_eq!(location.root, "mine");
        assert_eq!(location.index, "i.html");
        assert_eq!(location.autoindex, Some(false));
    }

    #[test]
    fn rejects_bad_ports() {
        for bad in ["0", "70000", "http", "host:"] {
            let text = format!("server {{\n listen {};\n}}\n", bad);
            assert!(
                matches!(parse_config_str(&text), Err(ConfigError::InvalidPort { line: 2, .. })),
                "listen {}",
                bad
            );
        }
    }

    #[test]
    fn rejects_structural_errors() {
        assert!(matches!(
            parse_config_str("server\n"),
            Err(ConfigError::MissingBrace { line: 1, .. })
        ));
        assert!(matches!(
            parse_config_str("server {\n location /x\n}\n"),
            Err(ConfigError::MissingBrace { line: 2, .. })
        ));
        assert!(matches!(
            parse_config_str("server {\n root www;\n"),
            Err(ConfigError::UnbalancedBraces { .. })
        ));
        assert!(matches!(
            parse_config_str("}\n"),
            Err(ConfigError::UnbalancedBraces { line: 1 })
        ));
        assert!(matches!(
            parse_config_str("worker_processes 4;\n"),
            Err(ConfigError::UnknownKeyword { line: 1, .. })
        ));
        assert!(matches!(
            parse_config_str("server {\n location /a {\n location /b {\n }\n }\n}\n"),
            Err(ConfigError::NestedLocation { line: 3 })
        ));
        assert!(matches!(
            parse_config_str("server {\n location {\n }\n}\n"),
            Err(ConfigError::MissingLocationPath { line: 2 })
        ));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse_config_str("server {\n client_max_body_size lots;\n}\n"),
            Err(ConfigError::InvalidBodySize { .. })
        ));
        assert!(matches!(
            parse_config_str("server {\n error_page 404;\n}\n"),
            Err(ConfigError::InvalidErrorPage { .. })
        ));
        assert!(matches!(
            parse_config_str("server {\n location / {\n autoindex maybe;\n }\n}\n"),
            Err(ConfigError::InvalidAutoindex { line: 3, .. })
        ));
    }

    #[test]
    fn unknown_block_directives_are_kept_raw() {
        let text = "server {\n gzip on;\n location / {\n proxy_pass http://x//y;\n }\n}\n";
        let servers = parse_config_str(text).unwrap();
        assert_eq!(servers[0].raw["gzip"], vec!["on"]);
        assert_eq!(servers[0].locations[0].raw["proxy_pass"], vec!["http://x//y"]);
    }

    #[test]
    fn error_page_accepts_several_codes() {
        let text = "server {\n error_page 500 502 503 err/5xx.html;\n}\n";
        let servers = parse_config_str(text).unwrap();
        for code in [500, 502, 503] {
            assert_eq!(servers[0].error_pages[&code], "err/5xx.html");
        }
    }

    #[test]
    fn body_size_suffixes() {
        assert_eq!(parse_body_size("1024"), Some(1024));
        assert_eq!(parse_body_size("10k"), Some(10 * 1024));
        assert_eq!(parse_body_size("1G"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_body_size("M"), None);
        assert_eq!(parse_body_size(""), None);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            parse_config("/definitely/not/here.conf"),
            Err(ConfigError::Io { .. })
        ));
    }
}
