//! Shared fixtures: an in-memory container runtime and destination builders.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sinkbyte_engine::config::types::{ContainerSettings, MountSettings};
use sinkbyte_engine::container::catalog::load_protocol_stream;
use sinkbyte_engine::container::lifecycle::{
    ContainerLogs, ContainerRuntime, ContainerSpec, RuntimeError, StdioTransport,
};
use sinkbyte_engine::container::ContainerDestination;
use sinkbyte_state::IdempotencyGuard;
use sinkbyte_types::definition::{ConnectorDefinition, ImageRef};
use sinkbyte_types::payload::DataPayload;
use uuid::Uuid;

pub const CONTAINER_UID: Uuid = Uuid::from_u128(0x1111);

/// Everything the fake runtime was asked to do.
#[derive(Debug, Default)]
pub struct Calls {
    pub pulled: Vec<String>,
    pub created: Vec<ContainerSpec>,
    /// Staged config contents observed at create time, per container.
    pub staged_configs: Vec<Option<String>>,
    pub started: Vec<String>,
    pub stdin: Vec<Vec<u8>>,
    pub input_closed: usize,
    pub removed: Vec<String>,
}

pub struct FakeRuntime {
    pub calls: Arc<Mutex<Calls>>,
    exit_code: i64,
    check_stdout: String,
    fail_pull: bool,
    wait_delay: Duration,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Calls::default())),
            exit_code: 0,
            check_stdout: String::new(),
            fail_pull: false,
            wait_delay: Duration::ZERO,
        }
    }

    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_check_stdout(mut self, stdout: &str) -> Self {
        self.check_stdout = stdout.to_string();
        self
    }

    pub fn failing_pull(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    pub fn with_wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = delay;
        self
    }

    pub fn created(&self) -> usize {
        self.calls.lock().unwrap().created.len()
    }

    pub fn removed(&self) -> usize {
        self.calls.lock().unwrap().removed.len()
    }
}

struct FakeStdio {
    calls: Arc<Mutex<Calls>>,
    buffer: Vec<u8>,
    closed: bool,
}

#[async_trait]
impl StdioTransport for FakeStdio {
    async fn write_input(&mut self, data: &[u8]) -> Result<(), RuntimeError> {
        if self.closed {
            return Err(RuntimeError::Engine("stdin closed".into()));
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn close_input(&mut self) -> Result<(), RuntimeError> {
        self.closed = true;
        let mut calls = self.calls.lock().unwrap();
        calls.input_closed += 1;
        calls.stdin.push(std::mem::take(&mut self.buffer));
        Ok(())
    }

    async fn read_output(&mut self) -> Result<String, RuntimeError> {
        Ok("write complete\n".to_string())
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn pull_image(&self, image: &ImageRef) -> Result<(), RuntimeError> {
        if self.fail_pull {
            return Err(RuntimeError::Engine("manifest unknown".into()));
        }
        self.calls.lock().unwrap().pulled.push(image.to_string());
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let config_arg = spec
            .cmd
            .iter()
            .position(|a| a == "--config")
            .and_then(|i| spec.cmd.get(i + 1));
        let staged = config_arg.and_then(|p| std::fs::read_to_string(p).ok());
        let mut calls = self.calls.lock().unwrap();
        calls.created.push(spec.clone());
        calls.staged_configs.push(staged);
        Ok(format!("id-{}", spec.name))
    }

    async fn attach(&self, _id: &str) -> Result<Box<dyn StdioTransport>, RuntimeError> {
        Ok(Box::new(FakeStdio {
            calls: Arc::clone(&self.calls),
            buffer: Vec::new(),
            closed: false,
        }))
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        self.calls.lock().unwrap().started.push(id.to_string());
        Ok(())
    }

    async fn wait(&self, _id: &str) -> Result<i64, RuntimeError> {
        if !self.wait_delay.is_zero() {
            tokio::time::sleep(self.wait_delay).await;
        }
        Ok(self.exit_code)
    }

    async fn logs(&self, _id: &str) -> Result<ContainerLogs, RuntimeError> {
        Ok(ContainerLogs {
            stdout: self.check_stdout.clone(),
            stderr: String::new(),
        })
    }

    async fn remove(&self, id: &str, remove_volumes: bool) -> Result<(), RuntimeError> {
        assert!(remove_volumes);
        self.calls.lock().unwrap().removed.push(id.to_string());
        Ok(())
    }
}

pub fn container_definition() -> ConnectorDefinition {
    ConnectorDefinition {
        uid: CONTAINER_UID,
        id: "acme-dest".into(),
        title: "Acme".into(),
        image: Some(ImageRef::new("acme/dest", "1.0")),
        spec: json!({
            "type": "object",
            "required": ["destination_path"],
            "properties": {"destination_path": {"type": "string"}}
        }),
        documentation_url: None,
    }
}

pub fn container_settings(workspace: &Path) -> ContainerSettings {
    ContainerSettings {
        workspace: MountSettings {
            source: workspace.display().to_string(),
            target: workspace.to_path_buf(),
        },
        tool_workspace: MountSettings {
            source: "tool-volume".into(),
            target: "/tmp/tool".into(),
        },
        ..ContainerSettings::default()
    }
}

pub fn container_destination(
    runtime: Arc<FakeRuntime>,
    workspace: &Path,
    completed_ttl: Duration,
) -> Arc<ContainerDestination> {
    Arc::new(
        ContainerDestination::new(
            vec![container_definition()],
            load_protocol_stream(None).unwrap(),
            &container_settings(workspace),
            runtime,
            IdempotencyGuard::new(completed_ttl),
        )
        .unwrap(),
    )
}

pub fn item(index: &str, outputs: Value) -> DataPayload {
    serde_json::from_value(json!({
        "data_mapping_index": index,
        "outputs": outputs,
        "metadata": {"pipeline": "pipe-1"},
    }))
    .unwrap()
}

/// Number of files left anywhere under `dir`.
pub fn file_count(dir: &Path) -> usize {
    fn walk(dir: &Path, count: &mut usize) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, count);
            } else {
                *count += 1;
            }
        }
    }
    let mut count = 0;
    walk(dir, &mut count);
    count
}
