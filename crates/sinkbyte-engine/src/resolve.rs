//! Definition reference resolution and connection config validation.

use serde_json::Value;
use sinkbyte_types::definition::ConnectorDefinition;
use uuid::Uuid;

use crate::error::{DestinationError, Result};
use crate::registry::Registry;

/// Resolve a uid string or a human-readable id.
///
/// # Errors
///
/// Returns [`DestinationError::NotFound`] if neither matches.
pub fn resolve_definition<'a>(
    registry: &'a Registry,
    reference: &str,
) -> Result<&'a ConnectorDefinition> {
    match Uuid::parse_str(reference) {
        Ok(uid) => registry.get(&uid),
        Err(_) => registry.get_by_id(reference),
    }
}

/// Validate `config` against the definition's JSON schema.
///
/// An empty or null schema accepts anything.
///
/// # Errors
///
/// Returns [`DestinationError::InvalidConfig`] listing every violation, or
/// [`DestinationError::Definitions`] if the schema itself is invalid.
pub fn validate_config_against_schema(
    definition: &ConnectorDefinition,
    config: &Value,
) -> Result<()> {
    let schema = &definition.spec;
    if schema.is_null() || schema.as_object().is_some_and(serde_json::Map::is_empty) {
        return Ok(());
    }

    let validator = jsonschema::validator_for(schema).map_err(|e| {
        DestinationError::Definitions(format!(
            "invalid JSON Schema for connector '{}': {e}",
            definition.id
        ))
    })?;

    let violations: Vec<String> = validator
        .iter_errors(config)
        .map(|e| format!("  - {e}"))
        .collect();

    if !violations.is_empty() {
        return Err(DestinationError::InvalidConfig {
            connector: definition.id.clone(),
            violations,
        });
    }

    tracing::debug!(connector = %definition.id, "Config schema validation passed");
    Ok(())
}
