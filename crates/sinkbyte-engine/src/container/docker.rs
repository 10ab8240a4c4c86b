//! [`ContainerRuntime`] over the Docker Engine API.

use std::pin::Pin;

use async_trait::async_trait;
use bollard::container::{
    AttachContainerOptions, AttachContainerResults, Config, CreateContainerOptions, LogOutput,
    LogsOptions, RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, Mount as DockerMount, MountTypeEnum};
use bollard::Docker;
use futures_util::{Stream, StreamExt};
use sinkbyte_types::definition::ImageRef;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::lifecycle::{
    ContainerLogs, ContainerRuntime, ContainerSpec, MountKind, RuntimeError, StdioTransport,
};

/// End-of-transmission after a newline; a tty only honors ^D at line start.
const TTY_EOF: &[u8] = b"\n\x04";

impl From<bollard::errors::Error> for RuntimeError {
    fn from(e: bollard::errors::Error) -> Self {
        Self::Engine(e.to_string())
    }
}

/// Docker-backed container runtime.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform's default socket.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Engine`] if the client cannot be configured.
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

fn to_docker_mount(mount: &super::lifecycle::Mount) -> DockerMount {
    DockerMount {
        source: Some(mount.source.clone()),
        target: Some(mount.target.clone()),
        typ: Some(match mount.kind {
            MountKind::Bind => MountTypeEnum::BIND,
            MountKind::Volume => MountTypeEnum::VOLUME,
        }),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull_image(&self, image: &ImageRef) -> Result<(), RuntimeError> {
        let options = CreateImageOptions {
            from_image: image.repository.clone(),
            tag: image.tag.clone(),
            ..Default::default()
        };
        let mut progress = self.docker.create_image(Some(options), None, None);
        while let Some(info) = progress.next().await {
            let info = info?;
            if let Some(status) = info.status {
                tracing::trace!(image = %image, status = %status, "Pull progress");
            }
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let config = Config {
            image: Some(spec.image.to_string()),
            cmd: Some(spec.cmd.clone()),
            attach_stdin: Some(spec.interactive),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            open_stdin: Some(spec.interactive),
            stdin_once: Some(spec.interactive),
            tty: Some(spec.interactive),
            host_config: Some(HostConfig {
                mounts: Some(spec.mounts.iter().map(to_docker_mount).collect()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };
        let created = self.docker.create_container(Some(options), config).await?;
        for warning in &created.warnings {
            tracing::warn!(container = %spec.name, warning = %warning, "Docker create warning");
        }
        Ok(created.id)
    }

    async fn attach(&self, id: &str) -> Result<Box<dyn StdioTransport>, RuntimeError> {
        let options = AttachContainerOptions::<String> {
            stdin: Some(true),
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            ..Default::default()
        };
        let AttachContainerResults { output, input } =
            self.docker.attach_container(id, Some(options)).await?;
        Ok(Box::new(DockerStdio {
            output,
            input: Some(input),
        }))
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn wait(&self, id: &str) -> Result<i64, RuntimeError> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut stream = self.docker.wait_container(id, Some(options));
        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // Non-zero exits arrive as an error carrying the code.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(e.into()),
            None => Err(RuntimeError::Engine(
                "wait stream ended without a status".to_string(),
            )),
        }
    }

    async fn logs(&self, id: &str) -> Result<ContainerLogs, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.logs(id, Some(options));
        let mut logs = ContainerLogs::default();
        while let Some(chunk) = stream.next().await {
            match chunk? {
                LogOutput::StdOut { message } | LogOutput::Console { message } => {
                    logs.stdout.push_str(&String::from_utf8_lossy(&message));
                }
                LogOutput::StdErr { message } => {
                    logs.stderr.push_str(&String::from_utf8_lossy(&message));
                }
                LogOutput::StdIn { .. } => {}
            }
        }
        Ok(logs)
    }

    async fn remove(&self, id: &str, remove_volumes: bool) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            v: remove_volumes,
            force: true,
            ..Default::default()
        };
        self.docker.remove_container(id, Some(options)).await?;
        Ok(())
    }
}

type OutputStream =
    Pin<Box<dyn Stream<Item = Result<LogOutput, bollard::errors::Error>> + Send>>;

struct DockerStdio {
    output: OutputStream,
    input: Option<Pin<Box<dyn AsyncWrite + Send>>>,
}

#[async_trait]
impl StdioTransport for DockerStdio {
    async fn write_input(&mut self, data: &[u8]) -> Result<(), RuntimeError> {
        let input = self
            .input
            .as_mut()
            .ok_or_else(|| RuntimeError::Engine("stdin already closed".to_string()))?;
        input.write_all(data).await?;
        Ok(())
    }

    async fn close_input(&mut self) -> Result<(), RuntimeError> {
        if let Some(mut input) = self.input.take() {
            input.write_all(TTY_EOF).await?;
            input.flush().await?;
            input.shutdown().await?;
        }
        Ok(())
    }

    async fn read_output(&mut self) -> Result<String, RuntimeError> {
        let mut out = String::new();
        while let Some(chunk) = self.output.next().await {
            match chunk? {
                LogOutput::StdIn { .. } => {}
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::Console { message } => {
                    out.push_str(&String::from_utf8_lossy(&message));
                }
            }
        }
        Ok(out)
    }
}
