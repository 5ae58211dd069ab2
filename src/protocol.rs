//! Wire protocol definitions.
//!
//! Each request and response is one self-contained JSON document per
//! newline-terminated line. Action payloads and response data travel as
//! stringified JSON so a line stays a flat, self-describing unit.

use serde::{Deserialize, Serialize};

/// Response status for a successful action.
pub const STATUS_OK: &str = "OK";

/// Response status for a failed action.
pub const STATUS_ERROR: &str = "ERROR";

/// Sentinel message marking an unsolicited log push.
///
/// Clients must distinguish pushes from replies by this marker, not by
/// ordering: once a stream is running, pushes may interleave with any
/// later reply on the same connection.
pub const LOG_LINE: &str = "LOG_LINE";

/// A decoded request line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Action tag (e.g. "LIST_IMAGES"). Missing tags are rejected at
    /// dispatch, not at decode.
    #[serde(default)]
    pub action: Option<String>,
    /// Action-specific payload as a stringified JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Request {
    /// Creates a request with no payload.
    #[must_use]
    pub fn new(action: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            payload: None,
        }
    }

    /// Creates a request with a stringified JSON payload.
    #[must_use]
    pub fn with_payload(action: &str, payload: String) -> Self {
        Self {
            action: Some(action.to_string()),
            payload: Some(payload),
        }
    }
}

/// A response line.
///
/// `data` holds stringified JSON for ordinary replies, or one raw log
/// line when `message` is [`LOG_LINE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// "OK" or "ERROR".
    pub status: String,
    /// Human-readable summary, or the LOG_LINE sentinel.
    pub message: String,
    /// Optional structured payload or raw log text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Response {
    /// Creates a success response.
    #[must_use]
    pub fn ok(message: impl Into<String>, data: Option<String>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Creates an unsolicited log push carrying exactly one log line.
    #[must_use]
    pub fn log_line(line: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: LOG_LINE.to_string(),
            data: Some(line.into()),
        }
    }

    /// Returns true if this response is a log push.
    #[must_use]
    pub fn is_log_line(&self) -> bool {
        self.message == LOG_LINE
    }
}

// ============================================================================
// Action payload parameters
// ============================================================================

/// Payload for PULL_IMAGE.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PullImageParams {
    /// Image name (required; validated at dispatch).
    #[serde(default)]
    pub image: Option<String>,
    /// Tag, defaulting to "latest" when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Payload for CREATE_CONTAINER and RUN_CONTAINER.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateContainerParams {
    /// Image to create the container from.
    #[serde(default)]
    pub image: Option<String>,
    /// Name to assign to the container.
    #[serde(default)]
    pub name: Option<String>,
}

/// Payload for START/STOP/REMOVE_CONTAINER and STREAM_LOGS.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContainerRefParams {
    /// Container id prefix or name.
    #[serde(default, rename = "idOrName")]
    pub id_or_name: Option<String>,
}

// ============================================================================
// Response data shapes (serialized to strings in `Response::data`)
// ============================================================================

/// One image in a LIST_IMAGES reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    /// Repository, or "<none>" when untagged.
    pub repository: String,
    /// Tag, or "<none>" when untagged.
    pub tag: String,
    /// Image id.
    pub id: String,
    /// Size in megabytes.
    pub size: f64,
}

/// Data for LIST_IMAGES.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesData {
    /// All images known to the runtime.
    pub images: Vec<ImageSummary>,
}

/// One container in a LIST_CONTAINERS reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Full container id.
    pub id: String,
    /// First name the runtime reports, empty if none.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Lifecycle state (e.g. "running", "exited").
    pub state: String,
}

/// Data for LIST_CONTAINERS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainersData {
    /// All containers, running and stopped.
    pub containers: Vec<ContainerSummary>,
}

/// Data for PULL_IMAGE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullData {
    pub image: String,
    pub tag: String,
    /// Always "pulled".
    pub status: String,
}

/// Data for CREATE_CONTAINER.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateData {
    pub id: String,
    pub name: String,
    pub image: String,
}

/// Data for RUN_CONTAINER.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunData {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Always "running".
    pub status: String,
}

/// Data for START/STOP/REMOVE_CONTAINER.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateData {
    pub id: String,
    /// "started", "stopped" or "removed".
    pub status: String,
}
