//! Protocol stream catalog.

use std::path::Path;

use sinkbyte_types::catalog::{Catalog, ConfiguredCatalog, ConfiguredStream, Stream};
use sinkbyte_types::wire::{DestinationSyncMode, SyncMode};

use crate::error::{DestinationError, Result};

const DEFAULT_PROTOCOL_YAML: &str = include_str!("../../seed/protocol.yaml");

/// Load the protocol stream from `path`, or the embedded default.
///
/// Only the first stream is used.
///
/// # Errors
///
/// Returns [`DestinationError::Definitions`] if the file cannot be read,
/// does not parse, or declares no stream.
pub fn load_protocol_stream(path: Option<&Path>) -> Result<Stream> {
    let content = match path {
        Some(p) => std::fs::read_to_string(p).map_err(|e| {
            DestinationError::Definitions(format!(
                "failed to read protocol file {}: {e}",
                p.display()
            ))
        })?,
        None => DEFAULT_PROTOCOL_YAML.to_string(),
    };
    let catalog: Catalog = serde_yaml::from_str(&content)
        .map_err(|e| DestinationError::Definitions(format!("failed to parse protocol: {e}")))?;
    catalog
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| DestinationError::Definitions("protocol declares no stream".to_string()))
}

/// Catalog for one write: the stream with `full_refresh` / `append`.
#[must_use]
pub fn configured_catalog(stream: &Stream) -> ConfiguredCatalog {
    ConfiguredCatalog {
        streams: vec![ConfiguredStream {
            stream: stream.clone(),
            sync_mode: SyncMode::FullRefresh,
            destination_sync_mode: DestinationSyncMode::Append,
        }],
    }
}
