//! Connector definition registry.

use std::collections::HashMap;

use sinkbyte_types::definition::ConnectorDefinition;
use uuid::Uuid;

use crate::error::{DestinationError, Result};

/// Definitions keyed by uid, listed in registration order.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    definitions: Vec<ConnectorDefinition>,
    by_uid: HashMap<Uuid, usize>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::DuplicateUid`] if the uid is already
    /// registered; the existing entry is left unchanged.
    pub fn register(&mut self, definition: ConnectorDefinition) -> Result<()> {
        if self.by_uid.contains_key(&definition.uid) {
            return Err(DestinationError::DuplicateUid(definition.uid));
        }
        self.by_uid.insert(definition.uid, self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    /// Definitions in registration order.
    #[must_use]
    pub fn list(&self) -> &[ConnectorDefinition] {
        &self.definitions
    }

    /// # Errors
    ///
    /// Returns [`DestinationError::NotFound`] if no definition has this uid.
    pub fn get(&self, uid: &Uuid) -> Result<&ConnectorDefinition> {
        self.by_uid
            .get(uid)
            .map(|&idx| &self.definitions[idx])
            .ok_or_else(|| DestinationError::NotFound(uid.to_string()))
    }

    /// Look up by human-readable id.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::NotFound`] if no definition has this id.
    pub fn get_by_id(&self, id: &str) -> Result<&ConnectorDefinition> {
        self.definitions
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| DestinationError::NotFound(id.to_string()))
    }

    #[must_use]
    pub fn contains(&self, uid: &Uuid) -> bool {
        self.by_uid.contains_key(uid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
