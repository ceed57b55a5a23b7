pub mod connection;

use crate::config::ServerConfig;
use crate::handlers;
use crate::handlers::pages;
use crate::http::{HttpRequest, HttpResponse};
use crate::server::connection::{Connection, Phase, ReadStatus, WriteStatus};

use log::{debug, error, info, warn};
use mio::event::Event;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};

const LISTENER_TOKEN_MAX: usize = 1024; // listener tokens live below this
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Cap on the request head, also allowed on top of the body limit for
/// head and multipart framing.
const HEAD_ALLOWANCE: usize = 64 * 1024;

pub struct Server {
    poll: Poll,
    listeners: HashMap<Token, ListenerEntry>,
    connections: HashMap<Token, Connection>,
    servers: Vec<ServerConfig>,
    next_token: usize,
}

struct ListenerEntry {
    listener: TcpListener,
    server_idx: usize,
}

impl Server {
    pub fn new(servers: Vec<ServerConfig>) -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            listeners: HashMap::new(),
            connections: HashMap::new(),
            servers,
            next_token: LISTENER_TOKEN_MAX,
        })
    }

    /// Opens one listener per distinct address. The first server block that
    /// names an address owns it.
    pub fn bind(&mut self) -> io::Result<()> {
        let mut claimed: HashSet<SocketAddr> = HashSet::new();

        for (idx, s_cfg) in self.servers.iter().enumerate() {
            for &port in &s_cfg.ports {
                let addr = match resolve(&s_cfg.host, port) {
                    Ok(addr) => addr,
                    Err(e) => {
                        error!("[Setup] Cannot resolve {}:{}: {}", s_cfg.host, port, e);
                        continue;
                    }
                };
                if !claimed.insert(addr) {
                    warn!(
                        "[Setup] {} is already served by an earlier block, skipping it for `{}`",
                        addr, s_cfg.server_name
                    );
                    continue;
                }
                if self.listeners.len() >= LISTENER_TOKEN_MAX {
                    error!("[Setup] Too many listening addresses, ignoring {}", addr);
                    continue;
                }

                match TcpListener::bind(addr) {
                    Ok(mut listener) => {
                        let token = Token(self.listeners.len());
                        self.poll
                            .registry()
                            .register(&mut listener, token, Interest::READABLE)?;
                        self.listeners.insert(token, ListenerEntry {
                            listener,
                            server_idx: idx,
                        });
                        info!("[Setup] Bound to http://{}", addr);
                    }
                    Err(e) => error!("[Setup] Failed to bind {}: {}", addr, e),
                }
            }
        }

        if self.listeners.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no listening address could be bound",
            ));
        }
        Ok(())
    }

    pub fn run(&mut self) {
        let mut events = Events::with_capacity(1024);

        info!("[Reactor] Event loop started");
        loop {
            if let Err(e) = self.poll.poll(&mut events, Some(POLL_INTERVAL)) {
                if e.kind() != io::ErrorKind::Interrupted {
                    error!("[Reactor] Poll error: {}", e);
                }
                continue;
            }

            for event in events.iter() {
                let token = event.token();

                if self.listeners.contains_key(&token) {
                    self.accept_connection(token);
                } else {
                    self.handle_client_event(token, event);
                }
            }
            self.check_timeouts();
        }
    }

    fn handle_client_event(&mut self, token: Token, event: &Event) {
        if event.is_readable() {
            self.read_from_client(token);
        }

        if event.is_writable() {
            self.write_to_client(token);
        }

        if event.is_error() || event.is_write_closed() {
            self.close_connection(token);
        }
    }

    fn read_from_client(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };
        if conn.phase != Phase::Reading {
            return;
        }
        let cap = self.servers[conn.server_idx]
            .body_limit()
            .saturating_add(HEAD_ALLOWANCE);

        match conn.read_request(cap, HEAD_ALLOWANCE) {
            ReadStatus::Pending => {}
            ReadStatus::Ready => self.process_request(token),
            ReadStatus::HeadTooLarge => {
                warn!("[Network] No request head within {} bytes on {:?}", HEAD_ALLOWANCE, token);
                self.respond(token, |server| pages::error_response(400, server, false));
            }
            ReadStatus::Oversized => {
                warn!("[Network] Request on {:?} exceeds {} bytes", token, cap);
                self.respond(token, |server| pages::error_response(413, server, false));
            }
            ReadStatus::Closed => self.close_connection(token),
        }
    }

    fn process_request(&mut self, token: Token) {
        let parsed = match self.connections.get(&token) {
            Some(conn) => HttpRequest::parse(conn.request_bytes()),
            None => return,
        };

        self.respond(token, |server| match parsed {
            Some(request) => {
                let response = handlers::handle(&request, server);
                info!("{} {} -> {}", request.method, request.path, response.status);
                response
            }
            None => {
                warn!("[Network] Malformed request on {:?}", token);
                pages::error_response(400, server, false)
            }
        });
    }

    /// Builds a response against the connection's server block, queues it and
    /// switches the socket to write interest.
    fn respond<F>(&mut self, token: Token, build: F)
    where
        F: FnOnce(&ServerConfig) -> HttpResponse,
    {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };
        let response = build(&self.servers[conn.server_idx]);
        conn.respond(response.to_bytes());

        if let Err(e) = self
            .poll
            .registry()
            .reregister(&mut conn.stream, token, Interest::WRITABLE)
        {
            error!("[Reactor] Failed to reregister {:?}: {}", token, e);
            self.close_connection(token);
        }
    }

    fn write_to_client(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };
        if conn.phase != Phase::Writing {
            return;
        }

        match conn.flush() {
            WriteStatus::Pending => return,
            WriteStatus::Done => debug!("[Network] Response sent to {:?}", token),
            WriteStatus::Failed(e) => {
                let (sent, total) = conn.progress();
                warn!("[Network] Sent {} of {} bytes to {:?}: {}", sent, total, token, e);
            }
        }
        self.close_connection(token);
    }

    fn check_timeouts(&mut self) {
        let now = Instant::now();
        let to_remove: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_idle(now, IDLE_TIMEOUT))
            .map(|(&t, _)| t)
            .collect();

        for t in to_remove {
            debug!("[Network] Closing idle {:?}", t);
            self.close_connection(t);
        }
    }

    fn accept_connection(&mut self, server_token: Token) {
        let entry = match self.listeners.get(&server_token) {
            Some(entry) => entry,
            None => return,
        };
        let server_idx = entry.server_idx;

        loop {
            match entry.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    if let Err(e) =
                        self.poll.registry().register(&mut stream, token, Interest::READABLE)
                    {
                        error!("[Network] Failed to register client {}: {}", peer, e);
                        continue;
                    }
                    self.connections.insert(token, Connection::new(stream, server_idx));
                    debug!("[Network] New client {} as {:?}", peer, token);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("[Network] Accept failed: {}", e);
                    break;
                }
            }
        }
    }

    fn close_connection(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
    }
}

fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host has no address"))
}
