//! Bollard-backed container runtime.
//!
//! One `DockerRuntime` is built at process start and shared by every
//! session; bollard's `Docker` handle is cheap to clone and safe for
//! concurrent use.

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::image::{CreateImageOptions, ListImagesOptions};
use tokio_stream::StreamExt;

use super::{
    ContainerRecord, ContainerRuntime, ImageRecord, LogLineStream, LogOptions, RuntimeError,
};

/// Container runtime implemented over the Docker Engine API.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects to the local Docker daemon (auto-detects the socket).
    ///
    /// # Errors
    /// Returns error if the connection cannot be established.
    pub fn connect_local() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::ConnectionFailed(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Connects to a Docker daemon over HTTP (e.g. "tcp://localhost:2375").
    ///
    /// # Errors
    /// Returns error if the address is invalid.
    pub fn connect_http(addr: &str) -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_http(addr, 120, bollard::API_DEFAULT_VERSION)
            .map_err(|e| RuntimeError::ConnectionFailed(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Wraps an existing bollard handle.
    #[must_use]
    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }
}

impl std::fmt::Debug for DockerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerRuntime").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_images(&self) -> Result<Vec<ImageRecord>, RuntimeError> {
        let options = ListImagesOptions::<String> {
            all: true,
            ..Default::default()
        };
        let images = self
            .docker
            .list_images(Some(options))
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;

        Ok(images
            .into_iter()
            .map(|img| ImageRecord {
                repo_tags: img.repo_tags,
                id: img.id,
                size_bytes: img.size,
            })
            .collect())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerRecord {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c.state.unwrap_or_default(),
            })
            .collect())
    }

    async fn pull_image(&self, image: &str, tag: &str) -> Result<(), RuntimeError> {
        let options = CreateImageOptions {
            from_image: image.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };

        // The pull reports progress as a stream; drain it to completion.
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            progress.map_err(|e| RuntimeError::Api(e.to_string()))?;
        }
        Ok(())
    }

    async fn create_container(&self, image: &str, name: &str) -> Result<String, RuntimeError> {
        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };
        let config = Config {
            image: Some(image.to_string()),
            ..Default::default()
        };
        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;
        Ok(created.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))
    }

    fn stream_logs(&self, id: &str, options: LogOptions) -> LogLineStream {
        let logs_options = LogsOptions::<String> {
            follow: true,
            stdout: options.stdout,
            stderr: options.stderr,
            tail: options.tail,
            ..Default::default()
        };

        let stream = self.docker.logs(id, Some(logs_options)).map(|frame| {
            frame
                .map(|output| String::from_utf8_lossy(&output.into_bytes()).to_string())
                .map_err(|e| RuntimeError::Api(e.to_string()))
        });
        Box::pin(stream)
    }
}
