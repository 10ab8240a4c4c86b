//! Container lifecycle: the runtime seam and the managed run sequences.
//!
//! [`ContainerRuntime`] is the minimal container-engine surface a run
//! needs. [`LifecycleManager`] drives it through the write and check
//! sequences under the caller's [`ExecutionOptions`] and always removes the
//! container once it exists, under its own bounded timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sinkbyte_types::definition::ImageRef;

use crate::error::{DestinationError, Result};
use crate::execution::ExecutionOptions;

/// Errors from a [`ContainerRuntime`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("{0}")]
    Engine(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How a mount source is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    Bind,
    Volume,
}

impl MountKind {
    /// Absolute host paths are bind mounts; anything else names a volume.
    #[must_use]
    pub fn infer(source: &str) -> Self {
        if source.starts_with('/') {
            Self::Bind
        } else {
            Self::Volume
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub kind: MountKind,
    pub source: String,
    pub target: String,
}

impl Mount {
    /// Mount with kind inferred from `source`.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            kind: MountKind::infer(&source),
            source,
            target: target.into(),
        }
    }
}

/// Container to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: ImageRef,
    pub cmd: Vec<String>,
    pub mounts: Vec<Mount>,
    /// Attach stdin with a tty; input is written before start.
    pub interactive: bool,
}

/// Demultiplexed container logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerLogs {
    pub stdout: String,
    pub stderr: String,
}

/// Attached container stdio.
#[async_trait]
pub trait StdioTransport: Send {
    async fn write_input(&mut self, data: &[u8]) -> std::result::Result<(), RuntimeError>;

    /// Signal end of input. Further writes are an error.
    async fn close_input(&mut self) -> std::result::Result<(), RuntimeError>;

    /// Read combined output until the container closes it.
    async fn read_output(&mut self) -> std::result::Result<String, RuntimeError>;
}

/// Container engine operations used by destination runs.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull_image(&self, image: &ImageRef) -> std::result::Result<(), RuntimeError>;

    /// Create a container and return its id.
    async fn create_container(&self, spec: &ContainerSpec)
        -> std::result::Result<String, RuntimeError>;

    async fn attach(&self, id: &str) -> std::result::Result<Box<dyn StdioTransport>, RuntimeError>;

    async fn start(&self, id: &str) -> std::result::Result<(), RuntimeError>;

    /// Wait until the container is no longer running; returns its exit code.
    async fn wait(&self, id: &str) -> std::result::Result<i64, RuntimeError>;

    async fn logs(&self, id: &str) -> std::result::Result<ContainerLogs, RuntimeError>;

    async fn remove(&self, id: &str, remove_volumes: bool) -> std::result::Result<(), RuntimeError>;
}

/// Runs containers through their full lifecycle.
#[derive(Clone)]
pub struct LifecycleManager {
    runtime: Arc<dyn ContainerRuntime>,
    cleanup_timeout: Duration,
}

impl LifecycleManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, cleanup_timeout: Duration) -> Self {
        Self {
            runtime,
            cleanup_timeout,
        }
    }

    /// Pull, create, attach, write `input`, close input, start, capture
    /// output, wait, and remove.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::ImagePull`], or
    /// [`DestinationError::ContainerLifecycle`] naming the failed stage
    /// (a non-zero exit fails stage `wait`), or a deadline/cancellation
    /// error. The container is removed on every path once created.
    pub async fn run_write(
        &self,
        spec: &ContainerSpec,
        input: &[u8],
        opts: &ExecutionOptions,
    ) -> Result<String> {
        let id = self.prepare(spec, opts).await?;
        let outcome = self.drive_write(&id, input, opts).await;
        self.remove_bounded(&id, &spec.name).await;
        outcome
    }

    /// Pull, create, start, wait, fetch logs, and remove.
    ///
    /// The exit code is not inspected; the caller interprets the logs.
    ///
    /// # Errors
    ///
    /// As [`LifecycleManager::run_write`], without the exit-code check.
    pub async fn run_check(
        &self,
        spec: &ContainerSpec,
        opts: &ExecutionOptions,
    ) -> Result<ContainerLogs> {
        let id = self.prepare(spec, opts).await?;
        let outcome = self.drive_check(&id, opts).await;
        self.remove_bounded(&id, &spec.name).await;
        outcome
    }

    async fn prepare(&self, spec: &ContainerSpec, opts: &ExecutionOptions) -> Result<String> {
        let image = spec.image.to_string();
        tracing::info!(image = %image, container = %spec.name, "Pulling image");
        opts.run_stage("pull", async {
            self.runtime
                .pull_image(&spec.image)
                .await
                .map_err(|e| DestinationError::ImagePull {
                    image: image.clone(),
                    message: e.to_string(),
                })
        })
        .await?;

        let id = opts
            .run_stage("create", async {
                self.runtime
                    .create_container(spec)
                    .await
                    .map_err(|e| DestinationError::lifecycle("create", e))
            })
            .await?;
        tracing::debug!(container = %spec.name, id = %id, "Container created");
        Ok(id)
    }

    async fn drive_write(&self, id: &str, input: &[u8], opts: &ExecutionOptions) -> Result<String> {
        let mut stdio = opts
            .run_stage("attach", async {
                self.runtime
                    .attach(id)
                    .await
                    .map_err(|e| DestinationError::lifecycle("attach", e))
            })
            .await?;

        opts.run_stage("write", async {
            stdio
                .write_input(input)
                .await
                .map_err(|e| DestinationError::lifecycle("write", e))?;
            stdio
                .close_input()
                .await
                .map_err(|e| DestinationError::lifecycle("write", e))
        })
        .await?;

        opts.run_stage("start", async {
            self.runtime
                .start(id)
                .await
                .map_err(|e| DestinationError::lifecycle("start", e))
        })
        .await?;

        let output = opts
            .run_stage("output", async {
                stdio
                    .read_output()
                    .await
                    .map_err(|e| DestinationError::lifecycle("output", e))
            })
            .await?;

        let code = self.wait(id, opts).await?;
        if code != 0 {
            tracing::error!(id, code, output = %output, "Destination write exited with failure");
            return Err(DestinationError::lifecycle(
                "wait",
                format!("container exited with status {code}"),
            ));
        }
        Ok(output)
    }

    async fn drive_check(&self, id: &str, opts: &ExecutionOptions) -> Result<ContainerLogs> {
        opts.run_stage("start", async {
            self.runtime
                .start(id)
                .await
                .map_err(|e| DestinationError::lifecycle("start", e))
        })
        .await?;

        let code = self.wait(id, opts).await?;
        tracing::debug!(id, code, "Check container exited");

        opts.run_stage("logs", async {
            self.runtime
                .logs(id)
                .await
                .map_err(|e| DestinationError::lifecycle("logs", e))
        })
        .await
    }

    async fn wait(&self, id: &str, opts: &ExecutionOptions) -> Result<i64> {
        opts.run_stage("wait", async {
            self.runtime
                .wait(id)
                .await
                .map_err(|e| DestinationError::lifecycle("wait", e))
        })
        .await
    }

    /// Force-remove with volumes. Failures are logged, not returned.
    async fn remove_bounded(&self, id: &str, name: &str) {
        match tokio::time::timeout(self.cleanup_timeout, self.runtime.remove(id, true)).await {
            Ok(Ok(())) => tracing::debug!(container = %name, "Container removed"),
            Ok(Err(e)) => tracing::warn!(container = %name, error = %e, "Failed to remove container"),
            Err(_) => tracing::warn!(
                container = %name,
                timeout_secs = self.cleanup_timeout.as_secs(),
                "Timed out removing container"
            ),
        }
    }
}
