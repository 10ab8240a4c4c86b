//! Stream catalog types for the record protocol.
//!
//! A [`Catalog`] lists the [`Stream`]s the host can emit. A
//! [`ConfiguredCatalog`] is what a destination program receives for one
//! run: each stream paired with the sync and destination-sync modes to
//! apply.

use serde::{Deserialize, Serialize};

use crate::wire::{DestinationSyncMode, SyncMode};

/// A stream the host emits records for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// Stream name carried in every record.
    pub name: String,
    /// JSON schema of the record `data` objects.
    pub json_schema: serde_json::Value,
    /// Sync modes this stream supports.
    pub supported_sync_modes: Vec<SyncMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_defined_primary_key: Option<Vec<Vec<String>>>,
}

/// Collection of streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<Stream>,
}

/// A stream paired with the modes a destination should apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredStream {
    pub stream: Stream,
    pub sync_mode: SyncMode,
    pub destination_sync_mode: DestinationSyncMode,
}

/// Catalog handed to a destination program for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    pub streams: Vec<ConfiguredStream>,
}
