//! rdocker - interactive client entry point.
//!
//! Usage: rdocker [HOST] [PORT]
//!
//! Connects to a running rdockerd (default 127.0.0.1:5000) and starts
//! the command REPL.

use std::env;
use std::process;

use rdocker::config::{DEFAULT_HOST, DEFAULT_PORT, ServerConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!("rdocker v{}", VERSION);
        return;
    }

    let host = args.get(1).cloned().unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args
        .get(2)
        .map_or(DEFAULT_PORT, |p| ServerConfig::parse_port(p));

    if let Err(e) = rdocker::client::run(&host, port).await {
        eprintln!("Connection failed: {}", e);
        process::exit(1);
    }
}
