//! Routes a definition uid to the destination variant that owns it.

use std::sync::Arc;

use serde_json::Value;
use sinkbyte_types::definition::ConnectorDefinition;
use sinkbyte_types::payload::DataPayload;
use uuid::Uuid;

use crate::commit::{CommitConnection, CommitDestination};
use crate::container::{ContainerConnection, ContainerDestination};
use crate::error::{DestinationError, Result};
use crate::execution::ExecutionOptions;
use crate::registry::Registry;
use crate::resolve::{resolve_definition, validate_config_against_schema};
use crate::result::{CheckReport, ExecuteOutput};

/// A destination variant.
#[derive(Clone)]
pub enum Variant {
    Container(Arc<ContainerDestination>),
    Commit(Arc<CommitDestination>),
}

impl Variant {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Container(_) => "container",
            Self::Commit(_) => "commit",
        }
    }

    #[must_use]
    pub fn owns_uid(&self, uid: &Uuid) -> bool {
        match self {
            Self::Container(c) => c.owns_uid(uid),
            Self::Commit(c) => c.owns_uid(uid),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        match self {
            Self::Container(c) => c.registry(),
            Self::Commit(c) => c.registry(),
        }
    }

    /// # Errors
    ///
    /// Returns [`DestinationError::NotFound`] if this variant does not own `uid`.
    pub fn create_connection(&self, uid: &Uuid, config: Value) -> Result<Connection> {
        Ok(match self {
            Self::Container(c) => Connection::Container(c.connect(uid, config)?),
            Self::Commit(c) => Connection::Commit(c.connect(uid, config)?),
        })
    }
}

/// A connection created by [`Dispatcher::dispatch`].
pub enum Connection {
    Container(ContainerConnection),
    Commit(CommitConnection),
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container(c) => f.debug_tuple("Container").field(&c.definition().id).finish(),
            Self::Commit(c) => f.debug_tuple("Commit").field(&c.definition().id).finish(),
        }
    }
}

impl Connection {
    #[must_use]
    pub fn definition(&self) -> &ConnectorDefinition {
        match self {
            Self::Container(c) => c.definition(),
            Self::Commit(c) => c.definition(),
        }
    }

    /// Deliver `items` to the destination.
    ///
    /// # Errors
    ///
    /// Returns the owning engine's error unchanged.
    pub async fn execute(
        &self,
        items: &[DataPayload],
        opts: &ExecutionOptions,
    ) -> Result<ExecuteOutput> {
        match self {
            Self::Container(c) => c.execute(items, opts).await,
            Self::Commit(c) => c.execute(items, opts).await,
        }
    }

    /// Check connectivity.
    ///
    /// # Errors
    ///
    /// Returns the owning engine's error unchanged.
    pub async fn test(&self, opts: &ExecutionOptions) -> Result<CheckReport> {
        match self {
            Self::Container(c) => c.test(opts).await,
            Self::Commit(c) => c.test(opts).await,
        }
    }
}

/// Variants in priority order plus the composite registry of their
/// definitions.
pub struct Dispatcher {
    variants: Vec<Variant>,
    registry: Registry,
}

impl Dispatcher {
    /// Compose variants in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::DuplicateUid`] if two variants claim the
    /// same uid.
    pub fn new(variants: Vec<Variant>) -> Result<Self> {
        let mut registry = Registry::new();
        for variant in &variants {
            for definition in variant.registry().list() {
                registry.register(definition.clone()).map_err(|e| {
                    tracing::error!(
                        variant = variant.name(),
                        definition = %definition.id,
                        "Definition uid claimed by more than one variant"
                    );
                    e
                })?;
            }
        }
        tracing::info!(
            variants = variants.len(),
            definitions = registry.len(),
            "Dispatcher ready"
        );
        Ok(Self { variants, registry })
    }

    /// All definitions in presentation order.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Resolve a uid string or human-readable id.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::NotFound`] if nothing matches.
    pub fn resolve(&self, reference: &str) -> Result<&ConnectorDefinition> {
        resolve_definition(&self.registry, reference)
    }

    /// Create a connection through the first variant that owns `uid`.
    ///
    /// `config` is validated against the definition's schema first.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::UnknownDestination`] if no variant owns
    /// `uid`, or [`DestinationError::InvalidConfig`].
    pub fn dispatch(&self, uid: &Uuid, config: Value) -> Result<Connection> {
        let Some(variant) = self.variants.iter().find(|v| v.owns_uid(uid)) else {
            return Err(DestinationError::UnknownDestination(*uid));
        };
        let definition = variant.registry().get(uid)?;
        validate_config_against_schema(definition, &config)?;
        tracing::debug!(variant = variant.name(), definition = %definition.id, "Dispatching");
        variant.create_connection(uid, config)
    }
}
