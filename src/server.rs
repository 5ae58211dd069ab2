//! TCP listener.
//!
//! Accepts connections forever and spawns one [`Session`] per client.
//! There is no admission control; concurrency is bounded only by what
//! the OS accepts.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::runtime::ContainerRuntime;
use crate::session::Session;

/// Listener errors. Only binding can fail fatally; accept errors are
/// logged and the loop continues.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the configured address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// The docker control server.
pub struct DockerServer {
    config: ServerConfig,
    runtime: Arc<dyn ContainerRuntime>,
}

impl DockerServer {
    /// Creates a server sharing one runtime capability across all
    /// sessions.
    #[must_use]
    pub fn new(config: ServerConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { config, runtime }
    }

    /// Binds the configured address and serves forever.
    ///
    /// # Errors
    /// Returns error if the bind fails.
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(addr.as_str()).await.map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            source: e,
        })?;
        info!("listening on {addr}");
        self.serve(listener).await
    }

    /// Accept loop over an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!("client connected: {peer}");
                    let session = Session::new(Arc::clone(&self.runtime), peer.to_string());
                    tokio::spawn(session.run(stream));
                }
                Err(e) => {
                    error!("failed to accept connection: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::runtime::testing::FakeRuntime;

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        // Hold a socket, then ask the server to bind the same port.
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = ServerConfig {
            port,
            ..ServerConfig::default()
        };
        let server = DockerServer::new(config, Arc::new(FakeRuntime::new()));
        let result = server.run().await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}
