//! In-memory fake runtime for exercising the protocol layer without a
//! Docker daemon.
//!
//! Used by the unit tests and the integration suite; scripted containers,
//! images and log lines, with every runtime invocation recorded.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{
    ContainerRecord, ContainerRuntime, ImageRecord, LogLineStream, LogOptions, RuntimeError,
};

#[derive(Default)]
struct FakeState {
    images: Vec<ImageRecord>,
    containers: Vec<ContainerRecord>,
    logs: HashMap<String, Vec<String>>,
    log_errors: HashMap<String, String>,
    live_logs: HashMap<String, mpsc::UnboundedReceiver<String>>,
    calls: Vec<String>,
    fail_message: Option<String>,
    fail_on: Vec<(String, String)>,
    next_id: u64,
}

/// Scriptable in-memory [`ContainerRuntime`].
#[derive(Default)]
pub struct FakeRuntime {
    inner: Mutex<FakeState>,
}

impl FakeRuntime {
    /// Creates an empty fake runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a container record.
    pub fn add_container(&self, id: &str, name: &str, image: &str, state: &str) {
        self.state().containers.push(ContainerRecord {
            id: id.to_string(),
            names: vec![format!("/{name}")],
            image: image.to_string(),
            state: state.to_string(),
        });
    }

    /// Adds an image record.
    pub fn add_image(&self, repo_tags: &[&str], id: &str, size_bytes: i64) {
        self.state().images.push(ImageRecord {
            repo_tags: repo_tags.iter().map(|t| (*t).to_string()).collect(),
            id: id.to_string(),
            size_bytes,
        });
    }

    /// Scripts a finite set of log lines for a container.
    pub fn set_logs(&self, id: &str, lines: &[&str]) {
        self.state()
            .logs
            .insert(id.to_string(), lines.iter().map(|l| (*l).to_string()).collect());
    }

    /// Scripts a stream error delivered after any scripted lines.
    pub fn set_log_error(&self, id: &str, message: &str) {
        self.state()
            .log_errors
            .insert(id.to_string(), message.to_string());
    }

    /// Registers a live log channel for a container; lines sent on the
    /// returned sender are delivered through `stream_logs`.
    pub fn live_log_sender(&self, id: &str) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state().live_logs.insert(id.to_string(), rx);
        tx
    }

    /// Makes the next runtime invocation fail with the given message.
    pub fn fail_next(&self, message: &str) {
        self.state().fail_message = Some(message.to_string());
    }

    /// Makes the next invocation whose recorded call starts with `prefix`
    /// fail with the given message.
    pub fn fail_on(&self, prefix: &str, message: &str) {
        self.state()
            .fail_on
            .push((prefix.to_string(), message.to_string()));
    }

    /// Returns every runtime invocation recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    fn record(&self, call: String) -> Result<(), RuntimeError> {
        let mut state = self.state();
        if let Some(pos) = state.fail_on.iter().position(|(p, _)| call.starts_with(p)) {
            let (_, msg) = state.fail_on.remove(pos);
            state.calls.push(call);
            return Err(RuntimeError::Api(msg));
        }
        state.calls.push(call);
        match state.fail_message.take() {
            Some(msg) => Err(RuntimeError::Api(msg)),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_images(&self) -> Result<Vec<ImageRecord>, RuntimeError> {
        self.record("list_images".to_string())?;
        Ok(self.state().images.clone())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>, RuntimeError> {
        self.record(format!("list_containers:{all}"))?;
        Ok(self.state().containers.clone())
    }

    async fn pull_image(&self, image: &str, tag: &str) -> Result<(), RuntimeError> {
        self.record(format!("pull:{image}:{tag}"))
    }

    async fn create_container(&self, image: &str, name: &str) -> Result<String, RuntimeError> {
        self.record(format!("create:{image}:{name}"))?;
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("cid-{:04}", state.next_id);
        state.containers.push(ContainerRecord {
            id: id.clone(),
            names: vec![format!("/{name}")],
            image: image.to_string(),
            state: "created".to_string(),
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(format!("start:{id}"))?;
        let mut state = self.state();
        match state.containers.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.state = "running".to_string();
                Ok(())
            }
            None => Err(RuntimeError::Api(format!("No such container: {id}"))),
        }
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(format!("stop:{id}"))?;
        let mut state = self.state();
        match state.containers.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.state = "exited".to_string();
                Ok(())
            }
            None => Err(RuntimeError::Api(format!("No such container: {id}"))),
        }
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        self.record(format!("remove:{id}:{force}"))?;
        let mut state = self.state();
        let before = state.containers.len();
        state.containers.retain(|c| c.id != id);
        if state.containers.len() == before {
            return Err(RuntimeError::Api(format!("No such container: {id}")));
        }
        Ok(())
    }

    fn stream_logs(&self, id: &str, _options: LogOptions) -> LogLineStream {
        let mut state = self.state();
        state.calls.push(format!("logs:{id}"));

        if let Some(rx) = state.live_logs.remove(id) {
            return Box::pin(UnboundedReceiverStream::new(rx).map(Ok));
        }

        let mut items: Vec<Result<String, RuntimeError>> = state
            .logs
            .get(id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(Ok)
            .collect();
        if let Some(msg) = state.log_errors.get(id) {
            items.push(Err(RuntimeError::Api(msg.clone())));
        }
        Box::pin(tokio_stream::iter(items))
    }
}
