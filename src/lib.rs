//! rdocker
//!
//! Remote control of a Docker daemon over a line-delimited JSON protocol.
//!
//! # Architecture
//!
//! - **Protocol Module**: one JSON request/response per line
//! - **Runtime Module**: the `ContainerRuntime` capability, backed by bollard
//! - **Dispatch Module**: request validation and action execution
//! - **Session Module**: per-connection read loop and serialized writes,
//!   including unsolicited LOG_LINE pushes from streaming tasks
//! - **Server Module**: TCP accept loop
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use rdocker::config::ServerConfig;
//! use rdocker::runtime::DockerRuntime;
//! use rdocker::server::DockerServer;
//!
//! # async fn serve() {
//! let runtime = Arc::new(DockerRuntime::connect_local().expect("docker"));
//! let server = DockerServer::new(ServerConfig::default(), runtime);
//! server.run().await.expect("server");
//! # }
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]

pub mod client;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod protocol;
pub mod resolve;
pub mod runtime;
pub mod server;
pub mod session;

// Re-export main types
pub use config::ServerConfig;
pub use protocol::{Request, Response};
pub use runtime::{ContainerRuntime, DockerRuntime};
pub use server::DockerServer;
pub use session::Session;
