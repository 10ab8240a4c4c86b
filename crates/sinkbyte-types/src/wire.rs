//! Sync-mode enums shared by catalogs and the record protocol.

use serde::{Deserialize, Serialize};

/// How data is read from the upstream stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// One-time full read of all records.
    FullRefresh,
    /// Cursor-based incremental reads.
    Incremental,
}

/// How the destination applies incoming records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationSyncMode {
    /// Insert all records.
    Append,
    /// Replace the destination stream each run.
    Overwrite,
    /// Append, then deduplicate by primary key.
    AppendDedup,
}
