//! Destination call result types.

use std::collections::BTreeMap;

use serde::Serialize;
use sinkbyte_types::state::{ConnectorState, RunKey};

/// Result of a destination `test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub state: ConnectorState,
    /// Failure reported by the destination, when `state` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl CheckReport {
    #[must_use]
    pub fn connected() -> Self {
        Self {
            state: ConnectorState::Connected,
            failure: None,
        }
    }

    #[must_use]
    pub fn error(failure: impl Into<String>) -> Self {
        Self {
            state: ConnectorState::Error,
            failure: Some(failure.into()),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectorState::Connected
    }
}

/// Summary of a container-backed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub run_key: RunKey,
    /// Records written to the destination program.
    pub records: usize,
}

/// Reference to a committed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReference {
    pub asset_url: String,
    pub asset_cid: String,
    pub asset_tree_cid: String,
}

/// Output of a destination `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteOutput {
    /// Records were handed to a container-backed destination.
    Delivered(DeliverySummary),
    /// Assets committed, keyed by the producing item's data mapping index.
    Assets(BTreeMap<String, Vec<AssetReference>>),
}
