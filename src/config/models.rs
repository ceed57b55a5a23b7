use std::collections::BTreeMap;
use std::fmt::Write;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ROOT: &str = "www";
pub const DEFAULT_INDEX: &str = "index.html";

/// Applied at use time when `client_max_body_size` is unset (0).
pub const DEFAULT_MAX_BODY_SIZE: usize = 100 * 1024 * 1024;

/// Error pages every server gets unless the config overrides them.
pub const DEFAULT_ERROR_PAGES: [(u16, &str); 5] = [
    (400, "error/400.html"),
    (403, "error/403.html"),
    (404, "error/404.html"),
    (413, "error/413.html"),
    (500, "error/500.html"),
];

/// Every directive seen in a block, verbatim, in arrival order per key.
pub type RawDirectives = BTreeMap<String, Vec<String>>;

/// One `location <prefix> { ... }` block.
///
/// Text fields use the empty string as the "unset" marker until
/// [`apply_inheritance`](super::apply_inheritance) fills them from the
/// owning server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationConfig {
    pub path: String,
    pub root: String,
    pub index: String,
    pub autoindex: Option<bool>,
    pub upload_path: String,
    /// Upper-cased method names; empty means every method is accepted.
    pub methods: Vec<String>,
    pub raw: RawDirectives,
}

impl LocationConfig {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }

    pub fn autoindex(&self) -> bool {
        self.autoindex.unwrap_or(false)
    }

    pub fn allows(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m == method)
    }
}

/// One `server { ... }` block, fully defaulted once parsing returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    /// `listen` values exactly as written.
    pub listen_entries: Vec<String>,
    /// Validated ports, duplicates dropped, first-seen order kept.
    pub ports: Vec<u16>,
    pub server_name: String,
    pub root: String,
    pub index: String,
    pub autoindex: bool,
    pub upload_path: String,
    /// Zero means unset; see [`ServerConfig::body_limit`].
    pub client_max_body_size: usize,
    pub error_pages: BTreeMap<u16, String>,
    pub locations: Vec<LocationConfig>,
    pub raw: RawDirectives,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            listen_entries: Vec::new(),
            ports: Vec::new(),
            server_name: String::new(),
            root: String::new(),
            index: String::new(),
            autoindex: false,
            upload_path: String::new(),
            client_max_body_size: 0,
            error_pages: BTreeMap::new(),
            locations: Vec::new(),
            raw: RawDirectives::new(),
        }
    }
}

impl ServerConfig {
    pub fn body_limit(&self) -> usize {
        if self.client_max_body_size == 0 {
            DEFAULT_MAX_BODY_SIZE
        } else {
            self.client_max_body_size
        }
    }

    /// The policy used when no location prefix matches: an implicit `/`
    /// carrying the server's own settings.
    pub fn implicit_location(&self) -> LocationConfig {
        LocationConfig {
            path: "/".to_string(),
            root: self.root.clone(),
            index: self.index.clone(),
            autoindex: Some(self.autoindex),
            upload_path: self.upload_path.clone(),
            methods: Vec::new(),
            raw: RawDirectives::new(),
        }
    }

    pub fn addresses(&self) -> impl Iterator<Item = String> + '_ {
        self.ports.iter().map(move |port| format!("{}:{}", self.host, port))
    }

    /// Human-readable dump of the resolved configuration.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let name = if self.server_name.is_empty() { "(unnamed)" } else { &self.server_name };
        let _ = writeln!(out, "server {}", name);
        let ports: Vec<String> = self.ports.iter().map(u16::to_string).collect();
        let _ = writeln!(out, "  listen:        {}:[{}]", self.host, ports.join(", "));
        let _ = writeln!(out, "  root:          {}", self.root);
        let _ = writeln!(out, "  index:         {}", self.index);
        let _ = writeln!(out, "  autoindex:     {}", on_off(self.autoindex));
        let _ = writeln!(out, "  max body size: {} bytes", self.body_limit());
        let _ = writeln!(out, "  error pages:");
        for (code, path) in &self.error_pages {
            let _ = writeln!(out, "    {} -> {}", code, path);
        }
        for location in &self.locations {
            let _ = writeln!(out, "  location {}", location.path);
            let _ = writeln!(out, "    root:        {}", location.root);
            let _ = writeln!(out, "    index:       {}", location.index);
            let _ = writeln!(out, "    autoindex:   {}", on_off(location.autoindex()));
            if !location.upload_path.is_empty() {
                let _ = writeln!(out, "    upload_path: {}", location.upload_path);
            }
            if !location.methods.is_empty() {
                let _ = writeln!(out, "    methods:     {}", location.methods.join(" "));
            }
        }
        out
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}
