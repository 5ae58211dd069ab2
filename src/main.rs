//! rdockerd - server entry point.
//!
//! Usage: rdockerd [PORT] [OPTIONS]
//!
//! Options:
//!   --version, -v          Show version
//!   --port <PORT>          Port to listen on (default: 5000)
//!   --host <HOST>          Interface to bind (default: 127.0.0.1)
//!   --docker-host <ADDR>   Docker daemon address, e.g. tcp://localhost:2375
//!                          (default: local socket)

use std::env;
use std::process;
use std::sync::Arc;

use rdocker::config::ServerConfig;
use rdocker::runtime::DockerRuntime;
use rdocker::server::DockerServer;
use rdocker::{logging, runtime::RuntimeError};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn parse_config(args: &[String]) -> ServerConfig {
    let mut config = ServerConfig::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--port" | "-p" => {
                if let Some(value) = iter.next() {
                    config.port = ServerConfig::parse_port(value);
                }
            }
            "--host" => {
                if let Some(value) = iter.next() {
                    config.host = value.clone();
                }
            }
            "--docker-host" => {
                if let Some(value) = iter.next() {
                    config.docker_host = Some(value.clone());
                }
            }
            other if !other.starts_with('-') => {
                // Bare positional argument is the port.
                config.port = ServerConfig::parse_port(other);
            }
            _ => {}
        }
    }
    config
}

fn connect_runtime(config: &ServerConfig) -> Result<DockerRuntime, RuntimeError> {
    match config.docker_host.as_deref() {
        Some(addr) => DockerRuntime::connect_http(addr),
        None => DockerRuntime::connect_local(),
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!("rdockerd v{}", VERSION);
        return;
    }

    logging::init();
    let config = parse_config(&args);

    // One shared runtime handle for every session.
    let runtime = match connect_runtime(&config) {
        Ok(runtime) => Arc::new(runtime),
        Err(e) => {
            eprintln!("Failed to connect to Docker: {}", e);
            process::exit(1);
        }
    };

    let server = DockerServer::new(config, runtime);
    if let Err(e) = server.run().await {
        eprintln!("Server failed: {}", e);
        process::exit(1);
    }
}
