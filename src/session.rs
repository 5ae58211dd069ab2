//! Per-connection session handling.
//!
//! A session owns one accepted connection end to end: the line-oriented
//! read loop, the write-serialization gate, and the lifecycle of any log
//! push tasks it spawns. Every line written to the connection, reply or
//! push, goes through one mutex-guarded writer and is flushed as a whole
//! before the lock is released; that is what keeps concurrent pushes and
//! replies from interleaving partial lines.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, WriteHalf,
};
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::dispatch::{DispatchOutcome, dispatch};
use crate::protocol::{Request, Response};
use crate::runtime::{ContainerRuntime, LogOptions};

/// One client connection.
pub struct Session {
    runtime: Arc<dyn ContainerRuntime>,
    peer: String,
}

/// The session's output side: one full response line per lock hold.
type SharedWriter<S> = Arc<Mutex<BufWriter<WriteHalf<S>>>>;

impl Session {
    /// Creates a session for an accepted connection.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, peer: String) -> Self {
        Self { runtime, peer }
    }

    /// Runs the session until the client disconnects or the stream
    /// faults. Any log push tasks are signaled to stop on the way out.
    pub async fn run<S>(self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let writer: SharedWriter<S> = Arc::new(Mutex::new(BufWriter::new(write_half)));
        let stop_streams = Arc::new(AtomicBool::new(false));

        let mut lines = BufReader::new(read_half).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!(peer = %self.peer, "client disconnected");
                    break;
                }
                Err(e) => {
                    warn!(peer = %self.peer, "read error: {e}");
                    break;
                }
            };

            debug!(peer = %self.peer, "received: {line}");
            let request: Request = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(e) => {
                    let resp = Response::error(format!("Invalid request: {e}"));
                    if send_line(&writer, &resp).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            match dispatch(&request, self.runtime.as_ref()).await {
                DispatchOutcome::Reply(resp) => {
                    if send_line(&writer, &resp).await.is_err() {
                        break;
                    }
                }
                DispatchOutcome::StreamLogs { ack, container_id } => {
                    // Ack before the first push so the client sees the
                    // reply in request order.
                    if send_line(&writer, &ack).await.is_err() {
                        break;
                    }
                    self.spawn_log_push(&writer, &stop_streams, container_id);
                }
            }
        }

        // Best-effort teardown: push tasks check this flag before every
        // write and exit on the next log line.
        stop_streams.store(true, Ordering::Relaxed);
    }

    /// Spawns the push task for one STREAM_LOGS request. The task relays
    /// log lines as unsolicited LOG_LINE responses until the runtime
    /// stream ends, errors, the write side dies, or the session stops.
    fn spawn_log_push<S>(
        &self,
        writer: &SharedWriter<S>,
        stop: &Arc<AtomicBool>,
        container_id: String,
    ) where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mut stream = self
            .runtime
            .stream_logs(&container_id, LogOptions::default());
        let writer = Arc::clone(writer);
        let stop = Arc::clone(stop);
        let peer = self.peer.clone();

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                match item {
                    Ok(line) => {
                        let push = Response::log_line(line.trim());
                        if send_line(&writer, &push).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(peer = %peer, container = %container_id, "log stream error: {e}");
                        let push = Response::log_line(format!("[LOG_ERROR] {e}"));
                        let _ = send_line(&writer, &push).await;
                        break;
                    }
                }
            }
            debug!(peer = %peer, container = %container_id, "log push task finished");
        });
    }
}

/// Writes one full response line and flushes it while holding the gate.
async fn send_line<S>(writer: &SharedWriter<S>, response: &Response) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite,
{
    let json = serde_json::to_string(response).map_err(io::Error::other)?;
    let mut guard = writer.lock().await;
    guard.write_all(json.as_bytes()).await?;
    guard.write_all(b"\n").await?;
    guard.flush().await
}
