//! Content-commit destinations.
//!
//! Generated images are pinned (content addressing) and then committed as
//! notarized asset records. Authentication is either a per-connection
//! token from the connection config or one shared token for the process.

pub mod client;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use sinkbyte_types::commit::{CommitLicense, CommitRecord, GenerationMetadata};
use sinkbyte_types::definition::ConnectorDefinition;
use sinkbyte_types::payload::DataPayload;
use uuid::Uuid;

use crate::config::types::CommitSettings;
use crate::error::{DestinationError, Result};
use crate::execution::ExecutionOptions;
use crate::registry::Registry;
use crate::result::{AssetReference, CheckReport, ExecuteOutput};

use self::client::CommitClient;

/// Connection config field holding the per-connection token.
pub const CAPTURE_TOKEN_FIELD: &str = "captureToken";
const CREATOR_FIELD: &str = "creatorName";
const LICENSE_FIELD: &str = "license";

/// Output kind this destination commits; other kinds are skipped.
const TEXT_TO_IMAGE: &str = "text_to_image";
const ENCODING_FORMAT: &str = "image/jpeg";
const ABSTRACT: &str = "Image Generation";

/// How requests are authenticated. Chosen once at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitAuth {
    /// Token read from each connection's `captureToken` field.
    PerConnection,
    /// One token for every connection.
    SharedToken(String),
}

impl CommitAuth {
    /// Auth mode from settings. An enabled shared token wins.
    #[must_use]
    pub fn from_settings(settings: &CommitSettings) -> Self {
        if settings.shared_token.enabled {
            Self::SharedToken(settings.shared_token.token.clone())
        } else {
            Self::PerConnection
        }
    }
}

/// Content-commit destination variant.
pub struct CommitDestination {
    registry: Registry,
    client: CommitClient,
    auth: CommitAuth,
    asset_profile_url: String,
    generated_through: String,
}

impl CommitDestination {
    /// # Errors
    ///
    /// Returns [`DestinationError::DuplicateUid`] for a repeated uid, or
    /// [`DestinationError::Transport`] if the HTTP client cannot be built.
    pub fn new(definitions: Vec<ConnectorDefinition>, settings: &CommitSettings) -> Result<Self> {
        let mut registry = Registry::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        let auth = CommitAuth::from_settings(settings);
        tracing::info!(
            count = registry.len(),
            shared_token = matches!(auth, CommitAuth::SharedToken(_)),
            "Commit destinations registered"
        );
        Ok(Self {
            registry,
            client: CommitClient::new(&settings.api_base_url, settings.request_timeout())?,
            auth,
            asset_profile_url: settings.asset_profile_url.clone(),
            generated_through: settings.generated_through.clone(),
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

    /// # Errors
    ///
    /// Returns [`DestinationError::NotFound`] if the uid is not registered here.
    pub fn connect(self: &Arc<Self>, uid: &Uuid, config: Value) -> Result<CommitConnection> {
        let definition = self.registry.get(uid)?.clone();
        Ok(CommitConnection {
            destination: Arc::clone(self),
            definition,
            config,
        })
    }
}

/// One invocation against a commit destination.
pub struct CommitConnection {
    destination: Arc<CommitDestination>,
    definition: ConnectorDefinition,
    config: Value,
}

impl CommitConnection {
    #[must_use]
    pub fn definition(&self) -> &ConnectorDefinition {
        &self.definition
    }

    fn config_str(&self, field: &str) -> &str {
        self.config.get(field).and_then(Value::as_str).unwrap_or_default()
    }

    fn token(&self) -> Result<String> {
        match &self.destination.auth {
            CommitAuth::SharedToken(token) => Ok(token.clone()),
            CommitAuth::PerConnection => match self.config_str(CAPTURE_TOKEN_FIELD) {
                "" => Err(DestinationError::InvalidConfig {
                    connector: self.definition.id.clone(),
                    violations: vec![format!("  - {CAPTURE_TOKEN_FIELD} is required")],
                }),
                token => Ok(token.to_string()),
            },
        }
    }

    fn record(&self, model: &str, cid: String, sha256: String) -> CommitRecord {
        let generated_by = model.split('/').nth(1).unwrap_or(model);
        CommitRecord {
            asset_cid: cid,
            asset_sha256: sha256,
            encoding_format: ENCODING_FORMAT.to_string(),
            asset_timestamp_created: chrono::Utc::now().timestamp(),
            asset_creator: self.config_str(CREATOR_FIELD).to_string(),
            summary: ABSTRACT.to_string(),
            generation: GenerationMetadata {
                generated_by: generated_by.to_string(),
                generated_through: self.destination.generated_through.clone(),
                prompt: String::new(),
                creator_wallet: String::new(),
                license: CommitLicense {
                    name: self.config_str(LICENSE_FIELD).to_string(),
                },
            },
            testnet: false,
        }
    }

    /// Pin and commit every generated image, keyed by data mapping index.
    ///
    /// Stops at the first failure; a failed pin never reaches commit.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Parse`] for a malformed image entry or
    /// response, [`DestinationError::UpstreamHttp`], transport, or
    /// deadline/cancellation errors.
    pub async fn execute(
        &self,
        items: &[DataPayload],
        opts: &ExecutionOptions,
    ) -> Result<ExecuteOutput> {
        let token = self.token()?;
        let client = &self.destination.client;
        let mut assets: BTreeMap<String, Vec<AssetReference>> = BTreeMap::new();

        for item in items {
            for (model, output) in &item.outputs {
                let Some(images) = output
                    .get(TEXT_TO_IMAGE)
                    .and_then(|t| t.get("images"))
                    .and_then(Value::as_array)
                else {
                    tracing::debug!(
                        index = %item.data_mapping_index,
                        model = %model,
                        "Output is not a text-to-image result, skipping"
                    );
                    continue;
                };

                for (i, image) in images.iter().enumerate() {
                    let image = image.as_str().ok_or_else(|| {
                        DestinationError::Parse(format!(
                            "{model}.{TEXT_TO_IMAGE}.images[{i}] is not a string"
                        ))
                    })?;
                    let pinned = opts.run_stage("pin", client.pin(&token, image)).await?;
                    let record = self.record(model, pinned.cid, pinned.sha256);
                    let committed = opts.run_stage("commit", client.commit(&token, &record)).await?;
                    tracing::info!(
                        definition = %self.definition.id,
                        index = %item.data_mapping_index,
                        asset_cid = %committed.asset_cid,
                        "Asset committed"
                    );
                    assets
                        .entry(item.data_mapping_index.clone())
                        .or_default()
                        .push(AssetReference {
                            asset_url: format!(
                                "{}?cid={}",
                                self.destination.asset_profile_url, committed.asset_cid
                            ),
                            asset_cid: committed.asset_cid,
                            asset_tree_cid: committed.asset_tree_cid,
                        });
                }
            }
        }

        Ok(ExecuteOutput::Assets(assets))
    }

    /// Check the token against the identity endpoint.
    ///
    /// Transport failures are reported as an `Error` state with the
    /// transport message as the failure.
    ///
    /// # Errors
    ///
    /// Returns deadline/cancellation errors, or
    /// [`DestinationError::InvalidConfig`] when no token is available.
    pub async fn test(&self, opts: &ExecutionOptions) -> Result<CheckReport> {
        let token = self.token()?;
        let client = &self.destination.client;
        let outcome = opts
            .run_stage("identity", async { Ok(client.identity(&token).await) })
            .await?;
        Ok(match outcome {
            Ok(status) if status == reqwest::StatusCode::OK => CheckReport::connected(),
            Ok(status) => CheckReport::error(format!("identity check returned {}", status.as_u16())),
            Err(e) => {
                tracing::warn!(definition = %self.definition.id, error = %e, "Identity check failed");
                CheckReport::error(e.to_string())
            }
        })
    }
}
