//! Container runtime capability.
//!
//! The server core never talks to Docker directly; everything goes through
//! the [`ContainerRuntime`] trait so the protocol layer can be exercised
//! against a fake runtime in tests. The bollard-backed implementation lives
//! in [`docker`].

pub mod docker;
pub mod testing;

use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio_stream::Stream;

pub use docker::DockerRuntime;

/// Errors surfaced by a container runtime.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// No container matched a user-supplied id prefix or name.
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// Connection to the runtime daemon failed.
    #[error("Docker connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other failure reported by the runtime daemon.
    #[error("{0}")]
    Api(String),
}

/// One image as reported by the runtime.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// "repository:tag" references; empty when the image is untagged.
    pub repo_tags: Vec<String>,
    /// Image id.
    pub id: String,
    /// Size in bytes.
    pub size_bytes: i64,
}

/// One container as reported by the runtime.
#[derive(Debug, Clone)]
pub struct ContainerRecord {
    /// Full container id.
    pub id: String,
    /// All names, as the runtime reports them (Docker prefixes "/").
    pub names: Vec<String>,
    /// Image reference the container was created from.
    pub image: String,
    /// Lifecycle state (e.g. "running", "exited").
    pub state: String,
}

/// Options for a log stream.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Include stdout frames.
    pub stdout: bool,
    /// Include stderr frames.
    pub stderr: bool,
    /// How many trailing lines to start from ("all" for the full history).
    pub tail: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
        }
    }
}

/// An unbounded sequence of log lines, ending when the source closes
/// or errors.
pub type LogLineStream = Pin<Box<dyn Stream<Item = Result<String, RuntimeError>> + Send>>;

/// The container runtime capability consumed by the dispatcher and the
/// identifier resolver.
///
/// Implementations must be safe for concurrent use from many sessions;
/// the server shares one instance across all connections.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Lists all images.
    async fn list_images(&self) -> Result<Vec<ImageRecord>, RuntimeError>;

    /// Lists containers; `all` includes stopped ones.
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>, RuntimeError>;

    /// Pulls an image, blocking until the pull completes or fails.
    async fn pull_image(&self, image: &str, tag: &str) -> Result<(), RuntimeError>;

    /// Creates a named container and returns its id.
    async fn create_container(&self, image: &str, name: &str) -> Result<String, RuntimeError>;

    /// Starts a container by canonical id.
    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Stops a container by canonical id.
    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Removes a container by canonical id.
    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError>;

    /// Opens a follow-mode log stream for a container.
    ///
    /// The stream is lazy: nothing is read from the runtime until the
    /// caller polls it.
    fn stream_logs(&self, id: &str, options: LogOptions) -> LogLineStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RuntimeError::ContainerNotFound("ghost".to_string());
        assert_eq!(err.to_string(), "Container not found: ghost");
    }

    #[test]
    fn test_api_error_display_is_bare_message() {
        let err = RuntimeError::Api("daemon unreachable".to_string());
        assert_eq!(err.to_string(), "daemon unreachable");
    }

    #[test]
    fn test_log_options_default_tail_all() {
        let opts = LogOptions::default();
        assert!(opts.stdout);
        assert!(opts.stderr);
        assert_eq!(opts.tail, "all");
    }
}
