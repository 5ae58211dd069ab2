//! Action dispatch.
//!
//! Pure mapping from a decoded request to a runtime invocation and a
//! response. Validation happens before any runtime call, and every
//! runtime failure is converted to an ERROR response here; nothing from
//! the runtime propagates as a connection-level fault.

use serde::Serialize;

use crate::protocol::{
    ContainerRefParams, ContainerSummary, ContainersData, CreateContainerParams, CreateData,
    ImageSummary, ImagesData, PullData, PullImageParams, Request, Response, RunData, StateData,
};
use crate::resolve::resolve_container_id;
use crate::runtime::{ContainerRuntime, RuntimeError};

/// Placeholder for an untagged image's repository and tag.
const NONE_TAG: &str = "<none>";

/// Outcome of dispatching one request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Ordinary synchronous reply.
    Reply(Response),
    /// STREAM_LOGS: write the ack, then spawn a push task for the
    /// resolved container.
    StreamLogs {
        /// Immediate acknowledgement to send before any push.
        ack: Response,
        /// Canonical id of the container to stream.
        container_id: String,
    },
}

/// Dispatches one request against the runtime capability.
///
/// Always produces an outcome; failures become ERROR responses.
pub async fn dispatch(request: &Request, runtime: &dyn ContainerRuntime) -> DispatchOutcome {
    let Some(action) = request.action.as_deref() else {
        return DispatchOutcome::Reply(Response::error("Missing action"));
    };

    let payload = request.payload.as_deref();
    let reply = match action {
        "LIST_IMAGES" => list_images(runtime).await,
        "LIST_CONTAINERS" => list_containers(runtime).await,
        "PULL_IMAGE" => pull_image(runtime, action, payload).await,
        "CREATE_CONTAINER" => create_container(runtime, action, payload).await,
        "RUN_CONTAINER" => run_container(runtime, action, payload).await,
        "START_CONTAINER" => start_container(runtime, action, payload).await,
        "STOP_CONTAINER" => stop_container(runtime, action, payload).await,
        "REMOVE_CONTAINER" => remove_container(runtime, action, payload).await,
        "STREAM_LOGS" => return stream_logs(runtime, action, payload).await,
        unknown => Ok(Response::error(format!("Unknown action: {unknown}"))),
    };

    DispatchOutcome::Reply(reply.unwrap_or_else(server_error))
}

fn server_error(err: RuntimeError) -> Response {
    Response::error(format!("Server error: {err}"))
}

fn encode<T: Serialize>(value: &T) -> Result<String, RuntimeError> {
    serde_json::to_string(value).map_err(|e| RuntimeError::Api(e.to_string()))
}

/// Parses a required payload, or produces the validation error naming
/// the action.
fn parse_payload<T: serde::de::DeserializeOwned>(
    action: &str,
    payload: Option<&str>,
) -> Result<T, Response> {
    let Some(raw) = payload else {
        return Err(Response::error(format!("Missing payload for {action}")));
    };
    serde_json::from_str(raw).map_err(|e| server_error(RuntimeError::Api(e.to_string())))
}

async fn list_images(runtime: &dyn ContainerRuntime) -> Result<Response, RuntimeError> {
    let images = runtime.list_images().await?;
    let summaries = images
        .into_iter()
        .map(|img| {
            let (repository, tag) = split_repo_tag(img.repo_tags.first().map(String::as_str));
            ImageSummary {
                repository,
                tag,
                id: img.id,
                size: img.size_bytes as f64 / (1024.0 * 1024.0),
            }
        })
        .collect();
    let data = encode(&ImagesData { images: summaries })?;
    Ok(Response::ok("Images list", Some(data)))
}

/// Splits "repository:tag", defaulting both halves to "<none>".
fn split_repo_tag(repo_tag: Option<&str>) -> (String, String) {
    match repo_tag {
        Some(rt) => match rt.split_once(':') {
            Some((repo, tag)) => (repo.to_string(), tag.to_string()),
            None => (rt.to_string(), NONE_TAG.to_string()),
        },
        None => (NONE_TAG.to_string(), NONE_TAG.to_string()),
    }
}

async fn list_containers(runtime: &dyn ContainerRuntime) -> Result<Response, RuntimeError> {
    let containers = runtime.list_containers(true).await?;
    let summaries = containers
        .into_iter()
        .map(|c| ContainerSummary {
            id: c.id,
            name: c.names.first().cloned().unwrap_or_default(),
            image: c.image,
            state: c.state,
        })
        .collect();
    let data = encode(&ContainersData {
        containers: summaries,
    })?;
    Ok(Response::ok("Containers list", Some(data)))
}

async fn pull_image(
    runtime: &dyn ContainerRuntime,
    action: &str,
    payload: Option<&str>,
) -> Result<Response, RuntimeError> {
    let params: PullImageParams = match parse_payload(action, payload) {
        Ok(p) => p,
        Err(resp) => return Ok(resp),
    };
    let Some(image) = params.image else {
        return Ok(Response::error("Missing image name"));
    };
    let tag = match params.tag {
        Some(t) if !t.is_empty() => t,
        _ => "latest".to_string(),
    };

    runtime.pull_image(&image, &tag).await?;
    let data = encode(&PullData {
        image,
        tag,
        status: "pulled".to_string(),
    })?;
    Ok(Response::ok("Image pulled", Some(data)))
}

async fn create_container(
    runtime: &dyn ContainerRuntime,
    action: &str,
    payload: Option<&str>,
) -> Result<Response, RuntimeError> {
    let params: CreateContainerParams = match parse_payload(action, payload) {
        Ok(p) => p,
        Err(resp) => return Ok(resp),
    };
    let (Some(image), Some(name)) = (params.image, params.name) else {
        return Ok(Response::error("Missing image or name"));
    };

    let id = runtime.create_container(&image, &name).await?;
    let data = encode(&CreateData { id, name, image })?;
    Ok(Response::ok("Container created", Some(data)))
}

async fn run_container(
    runtime: &dyn ContainerRuntime,
    action: &str,
    payload: Option<&str>,
) -> Result<Response, RuntimeError> {
    let params: CreateContainerParams = match parse_payload(action, payload) {
        Ok(p) => p,
        Err(resp) => return Ok(resp),
    };
    let (Some(image), Some(name)) = (params.image, params.name) else {
        return Ok(Response::error("Missing image or name"));
    };

    // Create then start; a start failure leaves the created container in
    // place and is reported as a single error.
    let id = runtime.create_container(&image, &name).await?;
    runtime.start_container(&id).await?;
    let data = encode(&RunData {
        id,
        name,
        image,
        status: "running".to_string(),
    })?;
    Ok(Response::ok("Container created and started", Some(data)))
}

/// Extracts and resolves the `idOrName` payload field shared by the
/// container lifecycle actions.
async fn resolve_ref(
    runtime: &dyn ContainerRuntime,
    action: &str,
    payload: Option<&str>,
) -> Result<Result<String, RuntimeError>, Response> {
    let params: ContainerRefParams = parse_payload(action, payload)?;
    let Some(id_or_name) = params.id_or_name else {
        return Err(Response::error("Missing container idOrName"));
    };
    Ok(resolve_container_id(runtime, &id_or_name).await)
}

async fn start_container(
    runtime: &dyn ContainerRuntime,
    action: &str,
    payload: Option<&str>,
) -> Result<Response, RuntimeError> {
    let id = match resolve_ref(runtime, action, payload).await {
        Ok(resolved) => resolved?,
        Err(resp) => return Ok(resp),
    };
    runtime.start_container(&id).await?;
    let data = encode(&StateData {
        id,
        status: "started".to_string(),
    })?;
    Ok(Response::ok("Container started", Some(data)))
}

async fn stop_container(
    runtime: &dyn ContainerRuntime,
    action: &str,
    payload: Option<&str>,
) -> Result<Response, RuntimeError> {
    let id = match resolve_ref(runtime, action, payload).await {
        Ok(resolved) => resolved?,
        Err(resp) => return Ok(resp),
    };
    runtime.stop_container(&id).await?;
    let data = encode(&StateData {
        id,
        status: "stopped".to_string(),
    })?;
    Ok(Response::ok("Container stopped", Some(data)))
}

async fn remove_container(
    runtime: &dyn ContainerRuntime,
    action: &str,
    payload: Option<&str>,
) -> Result<Response, RuntimeError> {
    let id = match resolve_ref(runtime, action, payload).await {
        Ok(resolved) => resolved?,
        Err(resp) => return Ok(resp),
    };
    runtime.remove_container(&id, true).await?;
    let data = encode(&StateData {
        id,
        status: "removed".to_string(),
    })?;
    Ok(Response::ok("Container removed", Some(data)))
}

async fn stream_logs(
    runtime: &dyn ContainerRuntime,
    action: &str,
    payload: Option<&str>,
) -> DispatchOutcome {
    let resolved = match resolve_ref(runtime, action, payload).await {
        Ok(resolved) => resolved,
        Err(resp) => return DispatchOutcome::Reply(resp),
    };
    match resolved {
        Ok(container_id) => DispatchOutcome::StreamLogs {
            ack: Response::ok("Log streaming started", None),
            container_id,
        },
        Err(err) => DispatchOutcome::Reply(server_error(err)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::protocol::STATUS_ERROR;
    use crate::runtime::testing::FakeRuntime;
    use pretty_assertions::assert_eq;

    fn reply(outcome: DispatchOutcome) -> Response {
        match outcome {
            DispatchOutcome::Reply(resp) => resp,
            DispatchOutcome::StreamLogs { .. } => panic!("expected a plain reply"),
        }
    }

    async fn dispatch_reply(runtime: &FakeRuntime, request: Request) -> Response {
        reply(dispatch(&request, runtime).await)
    }

    #[tokio::test]
    async fn test_missing_action() {
        let runtime = FakeRuntime::new();
        let resp = dispatch_reply(&runtime, Request {
            action: None,
            payload: None,
        })
        .await;
        assert_eq!(resp.status, STATUS_ERROR);
        assert_eq!(resp.message, "Missing action");
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let runtime = FakeRuntime::new();
        let resp = dispatch_reply(&runtime, Request::new("DANCE")).await;
        assert_eq!(resp.message, "Unknown action: DANCE");
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_payload_names_the_action() {
        let runtime = FakeRuntime::new();
        for action in [
            "PULL_IMAGE",
            "CREATE_CONTAINER",
            "RUN_CONTAINER",
            "START_CONTAINER",
            "STOP_CONTAINER",
            "REMOVE_CONTAINER",
            "STREAM_LOGS",
        ] {
            let resp = dispatch_reply(&runtime, Request::new(action)).await;
            assert_eq!(resp.status, STATUS_ERROR);
            assert_eq!(resp.message, format!("Missing payload for {action}"));
        }
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_never_invoke_runtime() {
        let runtime = FakeRuntime::new();

        let resp = dispatch_reply(
            &runtime,
            Request::with_payload("PULL_IMAGE", "{}".to_string()),
        )
        .await;
        assert_eq!(resp.message, "Missing image name");

        let resp = dispatch_reply(
            &runtime,
            Request::with_payload("RUN_CONTAINER", "{\"image\":\"alpine\"}".to_string()),
        )
        .await;
        assert_eq!(resp.message, "Missing image or name");

        let resp = dispatch_reply(
            &runtime,
            Request::with_payload("STOP_CONTAINER", "{}".to_string()),
        )
        .await;
        assert_eq!(resp.message, "Missing container idOrName");

        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_images_empty() {
        let runtime = FakeRuntime::new();
        let resp = dispatch_reply(&runtime, Request::new("LIST_IMAGES")).await;
        assert_eq!(resp.status, "OK");
        assert_eq!(resp.message, "Images list");
        assert_eq!(resp.data.as_deref(), Some("{\"images\":[]}"));
    }

    #[tokio::test]
    async fn test_list_images_untagged_defaults() {
        let runtime = FakeRuntime::new();
        runtime.add_image(&[], "sha256:aaa", 2 * 1024 * 1024);
        let resp = dispatch_reply(&runtime, Request::new("LIST_IMAGES")).await;
        let data: ImagesData = serde_json::from_str(resp.data.as_deref().unwrap()).unwrap();
        assert_eq!(data.images[0].repository, "<none>");
        assert_eq!(data.images[0].tag, "<none>");
        assert!((data.images[0].size - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_list_containers_names_first_entry() {
        let runtime = FakeRuntime::new();
        runtime.add_container("abc", "web", "nginx:latest", "running");
        let resp = dispatch_reply(&runtime, Request::new("LIST_CONTAINERS")).await;
        assert_eq!(resp.message, "Containers list");
        let data: ContainersData = serde_json::from_str(resp.data.as_deref().unwrap()).unwrap();
        assert_eq!(data.containers[0].name, "/web");
        assert_eq!(data.containers[0].state, "running");
    }

    #[tokio::test]
    async fn test_pull_defaults_tag_to_latest() {
        let runtime = FakeRuntime::new();
        let resp = dispatch_reply(
            &runtime,
            Request::with_payload("PULL_IMAGE", "{\"image\":\"alpine\"}".to_string()),
        )
        .await;
        assert_eq!(resp.message, "Image pulled");
        assert_eq!(
            resp.data.as_deref(),
            Some("{\"image\":\"alpine\",\"tag\":\"latest\",\"status\":\"pulled\"}")
        );
        assert_eq!(runtime.calls(), vec!["pull:alpine:latest".to_string()]);
    }

    #[tokio::test]
    async fn test_pull_empty_tag_defaults_to_latest() {
        let runtime = FakeRuntime::new();
        let resp = dispatch_reply(
            &runtime,
            Request::with_payload(
                "PULL_IMAGE",
                "{\"image\":\"alpine\",\"tag\":\"\"}".to_string(),
            ),
        )
        .await;
        assert_eq!(resp.status, "OK");
        assert_eq!(runtime.calls(), vec!["pull:alpine:latest".to_string()]);
    }

    #[tokio::test]
    async fn test_create_container() {
        let runtime = FakeRuntime::new();
        let resp = dispatch_reply(
            &runtime,
            Request::with_payload(
                "CREATE_CONTAINER",
                "{\"image\":\"alpine\",\"name\":\"box\"}".to_string(),
            ),
        )
        .await;
        assert_eq!(resp.message, "Container created");
        let data: CreateData = serde_json::from_str(resp.data.as_deref().unwrap()).unwrap();
        assert_eq!(data.name, "box");
        assert_eq!(data.image, "alpine");
    }

    #[tokio::test]
    async fn test_run_container_creates_then_starts() {
        let runtime = FakeRuntime::new();
        let resp = dispatch_reply(
            &runtime,
            Request::with_payload(
                "RUN_CONTAINER",
                "{\"image\":\"alpine\",\"name\":\"box\"}".to_string(),
            ),
        )
        .await;
        assert_eq!(resp.message, "Container created and started");
        let data: RunData = serde_json::from_str(resp.data.as_deref().unwrap()).unwrap();
        assert_eq!(data.status, "running");
        let calls = runtime.calls();
        assert_eq!(calls[0], "create:alpine:box");
        assert!(calls[1].starts_with("start:"));
    }

    #[tokio::test]
    async fn test_run_container_start_failure_leaves_orphan() {
        let runtime = FakeRuntime::new();
        runtime.fail_on("start:", "image has no entrypoint");
        let resp = dispatch_reply(
            &runtime,
            Request::with_payload(
                "RUN_CONTAINER",
                "{\"image\":\"alpine\",\"name\":\"box\"}".to_string(),
            ),
        )
        .await;
        assert_eq!(resp.status, STATUS_ERROR);
        assert_eq!(resp.message, "Server error: image has no entrypoint");
        // No compensating removal: the created container stays.
        let containers = runtime.list_containers(true).await.unwrap();
        assert_eq!(containers.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_unknown_container() {
        let runtime = FakeRuntime::new();
        let resp = dispatch_reply(
            &runtime,
            Request::with_payload("STOP_CONTAINER", "{\"idOrName\":\"ghost\"}".to_string()),
        )
        .await;
        assert_eq!(resp.status, STATUS_ERROR);
        assert_eq!(resp.message, "Server error: Container not found: ghost");
        assert!(resp.data.is_none());
    }

    #[tokio::test]
    async fn test_start_resolves_then_starts() {
        let runtime = FakeRuntime::new();
        runtime.add_container("abcdef123456", "web", "nginx", "exited");
        let resp = dispatch_reply(
            &runtime,
            Request::with_payload("START_CONTAINER", "{\"idOrName\":\"web\"}".to_string()),
        )
        .await;
        assert_eq!(resp.message, "Container started");
        assert_eq!(
            resp.data.as_deref(),
            Some("{\"id\":\"abcdef123456\",\"status\":\"started\"}")
        );
    }

    #[tokio::test]
    async fn test_remove_is_forced() {
        let runtime = FakeRuntime::new();
        runtime.add_container("abcdef123456", "web", "nginx", "running");
        let resp = dispatch_reply(
            &runtime,
            Request::with_payload("REMOVE_CONTAINER", "{\"idOrName\":\"web\"}".to_string()),
        )
        .await;
        assert_eq!(resp.message, "Container removed");
        assert!(runtime.calls().contains(&"remove:abcdef123456:true".to_string()));
    }

    #[tokio::test]
    async fn test_runtime_failure_becomes_error_response() {
        let runtime = FakeRuntime::new();
        runtime.fail_next("daemon unreachable");
        let resp = dispatch_reply(&runtime, Request::new("LIST_CONTAINERS")).await;
        assert_eq!(resp.status, STATUS_ERROR);
        assert_eq!(resp.message, "Server error: daemon unreachable");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_server_error() {
        let runtime = FakeRuntime::new();
        let resp = dispatch_reply(
            &runtime,
            Request::with_payload("PULL_IMAGE", "not json".to_string()),
        )
        .await;
        assert_eq!(resp.status, STATUS_ERROR);
        assert!(resp.message.starts_with("Server error: "));
    }

    #[tokio::test]
    async fn test_stream_logs_resolves_and_acks() {
        let runtime = FakeRuntime::new();
        runtime.add_container("abcdef123456", "web", "nginx", "running");
        let outcome = dispatch(
            &Request::with_payload("STREAM_LOGS", "{\"idOrName\":\"web\"}".to_string()),
            &runtime,
        )
        .await;
        match outcome {
            DispatchOutcome::StreamLogs { ack, container_id } => {
                assert_eq!(ack.message, "Log streaming started");
                assert!(ack.data.is_none());
                assert_eq!(container_id, "abcdef123456");
            }
            DispatchOutcome::Reply(resp) => panic!("expected stream outcome, got {resp:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_logs_unknown_container_is_error_reply() {
        let runtime = FakeRuntime::new();
        let outcome = dispatch(
            &Request::with_payload("STREAM_LOGS", "{\"idOrName\":\"ghost\"}".to_string()),
            &runtime,
        )
        .await;
        let resp = reply(outcome);
        assert_eq!(resp.message, "Server error: Container not found: ghost");
    }
}
