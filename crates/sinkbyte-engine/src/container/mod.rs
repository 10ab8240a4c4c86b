//! Container-backed destinations.
//!
//! A write encodes pipeline outputs as protocol records, stages the
//! connection config and configured catalog in the shared workspace, and
//! feeds the records to the destination image's `write` command over
//! stdin. A test runs the image's `check` command and reads the reported
//! connection status.

pub mod catalog;
pub mod codec;
pub mod docker;
pub mod lifecycle;
pub mod staging;

use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};
use sinkbyte_state::{Admission, IdempotencyGuard};
use sinkbyte_types::catalog::Stream;
use sinkbyte_types::definition::{ConnectorDefinition, ImageRef};
use sinkbyte_types::payload::DataPayload;
use sinkbyte_types::protocol::StatusKind;
use sinkbyte_types::state::RunKey;
use uuid::Uuid;

use crate::config::types::{ContainerSettings, MountSettings};
use crate::error::{DestinationError, Result};
use crate::execution::ExecutionOptions;
use crate::registry::Registry;
use crate::result::{CheckReport, DeliverySummary, ExecuteOutput};

use self::lifecycle::{ContainerRuntime, ContainerSpec, LifecycleManager, Mount};
use self::staging::{StagedFile, StagingLayout};

/// Hex digits of the run-key digest used in container names.
const NAME_DIGEST_LEN: usize = 16;

/// Run key derived from the run inputs: SHA-256 over the definition uid,
/// canonical config JSON, and canonical items JSON.
///
/// # Errors
///
/// Returns [`DestinationError::ProtocolMarshal`] if the inputs cannot be
/// serialized.
pub fn derive_run_key(def_uid: &Uuid, config: &Value, items: &[DataPayload]) -> Result<RunKey> {
    let items =
        serde_json::to_value(items).map_err(|e| DestinationError::ProtocolMarshal(e.to_string()))?;
    let config_json = serde_json::to_vec(&canonicalize(config))
        .map_err(|e| DestinationError::ProtocolMarshal(e.to_string()))?;
    let items_json = serde_json::to_vec(&canonicalize(&items))
        .map_err(|e| DestinationError::ProtocolMarshal(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(def_uid.as_bytes());
    hasher.update(&config_json);
    hasher.update(&items_json);
    Ok(RunKey::new(hex::encode(hasher.finalize())))
}

/// Copy of `value` with every object's keys in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Container name for a write: stable per (definition, run key).
#[must_use]
pub fn write_container_name(def_uid: &Uuid, key: &RunKey) -> String {
    let digest = hex::encode(Sha256::digest(key.as_str().as_bytes()));
    format!("{def_uid}-{}-write", &digest[..NAME_DIGEST_LEN])
}

fn mount_of(settings: &MountSettings) -> Mount {
    Mount::new(
        settings.source.clone(),
        settings.target.display().to_string(),
    )
}

/// Container destination variant: its definitions and shared run machinery.
pub struct ContainerDestination {
    registry: Registry,
    lifecycle: LifecycleManager,
    stream: Stream,
    staging: StagingLayout,
    workspace: Mount,
    tool_workspace: Mount,
    guard: IdempotencyGuard<DeliverySummary>,
}

impl ContainerDestination {
    /// Build the variant from loaded definitions.
    ///
    /// Definitions without an image are skipped with a warning; a repeated
    /// uid fails.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::DuplicateUid`] for a repeated uid.
    pub fn new(
        definitions: Vec<ConnectorDefinition>,
        stream: Stream,
        settings: &ContainerSettings,
        runtime: Arc<dyn ContainerRuntime>,
        guard: IdempotencyGuard<DeliverySummary>,
    ) -> Result<Self> {
        let mut registry = Registry::new();
        for definition in definitions {
            if !definition.is_container_backed() {
                tracing::warn!(definition = %definition.id, "Definition has no image, skipping");
                continue;
            }
            registry.register(definition)?;
        }
        tracing::info!(count = registry.len(), "Container destinations registered");

        Ok(Self {
            registry,
            lifecycle: LifecycleManager::new(runtime, settings.cleanup_timeout()),
            stream,
            staging: StagingLayout::new(settings.workspace.target.clone()),
            workspace: mount_of(&settings.workspace),
            tool_workspace: mount_of(&settings.tool_workspace),
            guard,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn owns_uid(&self, uid: &Uuid) -> bool {
        self.registry.contains(uid)
    }

    /// Create a connection for a definition this variant owns.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::NotFound`] if the uid is not registered here.
    pub fn connect(self: &Arc<Self>, uid: &Uuid, config: Value) -> Result<ContainerConnection> {
        let definition = self.registry.get(uid)?.clone();
        Ok(ContainerConnection {
            destination: Arc::clone(self),
            definition,
            config,
        })
    }
}

/// One invocation against a container destination.
pub struct ContainerConnection {
    destination: Arc<ContainerDestination>,
    definition: ConnectorDefinition,
    config: Value,
}

impl ContainerConnection {
    #[must_use]
    pub fn definition(&self) -> &ConnectorDefinition {
        &self.definition
    }

    fn image(&self) -> Result<&ImageRef> {
        self.definition.image.as_ref().ok_or_else(|| {
            DestinationError::lifecycle("create", format!("definition {} has no image", self.definition.id))
        })
    }

    /// Deliver `items` to the destination program.
    ///
    /// A concurrent call with the same run key waits for the first and
    /// returns its result; only one container runs.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::ProtocolMarshal`] for unencodable input
    /// (before anything is staged), a staging error, or a lifecycle error.
    pub async fn execute(
        &self,
        items: &[DataPayload],
        opts: &ExecutionOptions,
    ) -> Result<ExecuteOutput> {
        let dest = &self.destination;
        let emitted_at = chrono::Utc::now().timestamp_millis();
        let encoded = codec::encode_records(items, &dest.stream.name, emitted_at)?;

        let key = match &opts.idempotency_key {
            Some(token) => RunKey::new(token.clone()),
            None => derive_run_key(&self.definition.uid, &self.config, items)?,
        };

        let permit = loop {
            match dest.guard.admit(&key)? {
                Admission::Proceed(permit) => break permit,
                Admission::Completed(summary) => {
                    tracing::info!(run_key = %key, "Returning retained result");
                    return Ok(ExecuteOutput::Delivered(summary));
                }
                Admission::InFlight(run) => {
                    tracing::info!(run_key = %key, "Waiting for in-flight run");
                    let waited = opts.run_stage("guard", async { Ok(run.wait().await) }).await?;
                    if let Some(summary) = waited {
                        return Ok(ExecuteOutput::Delivered(summary));
                    }
                    // The owner gave up; try to take the key.
                }
            }
        };

        let summary = match self.deliver(&key, &encoded, opts).await {
            Ok(summary) => summary,
            Err(e) if e.is_interrupted() => {
                tracing::warn!(run_key = %key, error = %e, "Write interrupted, guard entry released");
                return Err(e);
            }
            Err(e) => {
                tracing::error!(run_key = %key, error = %e, "Write failed, guard entry released");
                return Err(e);
            }
        };
        permit.complete(summary.clone())?;
        Ok(ExecuteOutput::Delivered(summary))
    }

    async fn deliver(
        &self,
        key: &RunKey,
        encoded: &codec::EncodedRecords,
        opts: &ExecutionOptions,
    ) -> Result<DeliverySummary> {
        let dest = &self.destination;
        let image = self.image()?;
        let name = write_container_name(&self.definition.uid, key);

        let config_path = dest.staging.config_path(&name);
        let config_json = serde_json::to_vec(&self.config)
            .map_err(|e| DestinationError::ProtocolMarshal(e.to_string()))?;
        let config_file = StagedFile::write(config_path.clone(), &config_json).map_err(|source| {
            DestinationError::ConfigWrite {
                path: config_path.display().to_string(),
                source,
            }
        })?;

        let catalog_path = dest.staging.catalog_path(&name);
        let catalog_json = serde_json::to_vec(&catalog::configured_catalog(&dest.stream))
            .map_err(|e| DestinationError::ProtocolMarshal(e.to_string()))?;
        let catalog_file =
            StagedFile::write(catalog_path.clone(), &catalog_json).map_err(|source| {
                DestinationError::CatalogWrite {
                    path: catalog_path.display().to_string(),
                    source,
                }
            })?;

        let spec = ContainerSpec {
            name: name.clone(),
            image: image.clone(),
            cmd: vec![
                "write".to_string(),
                "--config".to_string(),
                config_file.path_arg(),
                "--catalog".to_string(),
                catalog_file.path_arg(),
            ],
            mounts: vec![dest.workspace.clone(), dest.tool_workspace.clone()],
            interactive: true,
        };

        tracing::info!(
            definition = %self.definition.id,
            image = %image,
            container = %name,
            run_key = %key,
            records = encoded.count,
            "Writing records to destination"
        );
        let output = dest.lifecycle.run_write(&spec, &encoded.payload, opts).await?;
        tracing::debug!(container = %name, output = %output, "Destination output");

        Ok(DeliverySummary {
            run_key: key.clone(),
            records: encoded.count,
        })
    }

    /// Run the destination's `check` command.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::IndeterminateStatus`] if the output
    /// carries no connection status, or a staging or lifecycle error.
    pub async fn test(&self, opts: &ExecutionOptions) -> Result<CheckReport> {
        let dest = &self.destination;
        let image = self.image()?;
        let name = format!("{}-{}-check", self.definition.uid, Uuid::new_v4().simple());

        let config_path = dest.staging.config_path(&name);
        let config_json = serde_json::to_vec(&self.config)
            .map_err(|e| DestinationError::ProtocolMarshal(e.to_string()))?;
        let config_file = StagedFile::write(config_path.clone(), &config_json).map_err(|source| {
            DestinationError::ConfigWrite {
                path: config_path.display().to_string(),
                source,
            }
        })?;

        let spec = ContainerSpec {
            name: name.clone(),
            image: image.clone(),
            cmd: vec![
                "check".to_string(),
                "--config".to_string(),
                config_file.path_arg(),
            ],
            mounts: vec![dest.workspace.clone()],
            interactive: false,
        };

        tracing::info!(definition = %self.definition.id, image = %image, container = %name, "Checking destination");
        let logs = dest.lifecycle.run_check(&spec, opts).await?;
        if !logs.stderr.is_empty() {
            tracing::debug!(container = %name, stderr = %logs.stderr, "Check stderr");
        }

        let status = codec::scan_connection_status(&logs.stdout)
            .ok_or(DestinationError::IndeterminateStatus)?;
        Ok(match status.kind() {
            StatusKind::Succeeded => CheckReport::connected(),
            StatusKind::Failed => CheckReport::error(
                status
                    .message
                    .unwrap_or_else(|| "destination reported FAILED".to_string()),
            ),
            StatusKind::Other(other) => {
                CheckReport::error(format!("destination reported unknown status '{other}'"))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn derived_key_is_deterministic_and_input_sensitive() {
        let uid = Uuid::from_u128(1);
        let items: Vec<DataPayload> =
            vec![serde_json::from_value(json!({"data_mapping_index": "a", "outputs": {"m": {}}})).unwrap()];
        let a = derive_run_key(&uid, &json!({"p": 1}), &items).unwrap();
        let b = derive_run_key(&uid, &json!({"p": 1}), &items).unwrap();
        let c = derive_run_key(&uid, &json!({"p": 2}), &items).unwrap();
        let d = derive_run_key(&Uuid::from_u128(2), &json!({"p": 1}), &items).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn config_key_order_does_not_change_key() {
        let uid = Uuid::from_u128(1);
        let one: Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
        let two: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        assert_eq!(
            derive_run_key(&uid, &one, &[]).unwrap(),
            derive_run_key(&uid, &two, &[]).unwrap()
        );
    }

    #[test]
    fn write_container_name_shape() {
        let name = write_container_name(&Uuid::from_u128(7), &RunKey::new("retry-1"));
        assert!(name.starts_with("00000000-0000-0000-0000-000000000007-"));
        assert!(name.ends_with("-write"));
        assert_eq!(
            name,
            write_container_name(&Uuid::from_u128(7), &RunKey::new("retry-1"))
        );
    }

    proptest! {
        #[test]
        fn container_name_digest_is_fixed_width(token in ".{0,64}") {
            let name = write_container_name(&Uuid::nil(), &RunKey::new(token));
            let digest = name
                .trim_start_matches(&format!("{}-", Uuid::nil()))
                .trim_end_matches("-write");
            prop_assert_eq!(digest.len(), NAME_DIGEST_LEN);
            prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
