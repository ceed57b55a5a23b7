pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod logging;
pub mod routing;
pub mod server;
