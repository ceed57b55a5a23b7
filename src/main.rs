use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use webserv::config;
use webserv::logging;
use webserv::server::Server;

#[derive(Parser)]
#[command(name = "webserv")]
#[command(about = "HTTP/1.1 server driven by an nginx-style configuration file", long_about = None)]
struct Cli {
    /// Configuration file to load
    #[arg(default_value = "config/default.conf")]
    config: PathBuf,

    /// Raise log verbosity (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Parse the configuration, print it and exit
    #[arg(long, default_value_t = false)]
    check: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(logging::level_from_flags(cli.verbose, cli.quiet)) {
        eprintln!("Failed to initialize logger: {}", e);
        return ExitCode::FAILURE;
    }

    let servers = match config::parse_config(&cli.config) {
        Ok(s) => s,
        Err(e) => {
            error!("Fatal config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if servers.is_empty() {
        error!("Fatal config error: {} defines no server block", cli.config.display());
        return ExitCode::FAILURE;
    }

    if cli.check {
        for server in &servers {
            print!("{}", server.describe());
        }
        return ExitCode::SUCCESS;
    }

    for server in &servers {
        let addresses: Vec<String> = server.addresses().collect();
        info!(
            "server `{}`: root {} on {}",
            server.server_name,
            server.root,
            addresses.join(", ")
        );
    }

    let mut server = match Server::new(servers) {
        Ok(s) => s,
        Err(e) => {
            error!("Cannot create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.bind() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    server.run();
    ExitCode::SUCCESS
}
