//! Line-oriented record protocol messages.
//!
//! Every line exchanged with a destination program is one JSON
//! [`ProtocolMessage`]. The host writes `RECORD` messages to the
//! program's stdin; a `check` run answers with a `CONNECTION_STATUS`
//! message on stdout.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Record,
    State,
    Log,
    Spec,
    ConnectionStatus,
    Catalog,
    Trace,
    /// Any tag this host does not interpret.
    #[serde(other)]
    Unknown,
}

/// One record of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    pub stream: String,
    pub data: Map<String, Value>,
    /// Emission time in milliseconds since the Unix epoch.
    pub emitted_at: i64,
}

/// Result of a destination `check` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Interpretation of a [`ConnectionStatus::status`] value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKind {
    Succeeded,
    Failed,
    Other(String),
}

impl ConnectionStatus {
    /// Classify the raw status string.
    #[must_use]
    pub fn kind(&self) -> StatusKind {
        match self.status.as_str() {
            "SUCCEEDED" => StatusKind::Succeeded,
            "FAILED" => StatusKind::Failed,
            other => StatusKind::Other(other.to_string()),
        }
    }
}

/// Envelope for a single protocol line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordMessage>,
    #[serde(
        default,
        rename = "connectionStatus",
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_status: Option<ConnectionStatus>,
}

impl ProtocolMessage {
    /// Wrap a record.
    #[must_use]
    pub fn record(record: RecordMessage) -> Self {
        Self {
            kind: MessageType::Record,
            record: Some(record),
            connection_status: None,
        }
    }
}
