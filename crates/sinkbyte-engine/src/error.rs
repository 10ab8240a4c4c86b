//! Destination error model.
//!
//! Engines return these variants unchanged; the dispatcher only adds
//! [`DestinationError::UnknownDestination`]. Nothing here is retried
//! automatically.

use sinkbyte_state::GuardError;
use uuid::Uuid;

/// Errors produced by the registry, dispatcher, and destination engines.
#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    #[error("connector definition {0} is already registered")]
    DuplicateUid(Uuid),

    #[error("connector definition {0} not found")]
    NotFound(String),

    #[error("no destination variant owns definition {0}")]
    UnknownDestination(Uuid),

    #[error("failed to encode records: {0}")]
    ProtocolMarshal(String),

    #[error("failed to stage connector config at {path}: {source}")]
    ConfigWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stage configured catalog at {path}: {source}")]
    CatalogWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to pull image {image}: {message}")]
    ImagePull { image: String, message: String },

    #[error("container {stage} failed: {message}")]
    ContainerLifecycle { stage: &'static str, message: String },

    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid configuration for connector '{connector}':\n{}", .violations.join("\n"))]
    InvalidConfig {
        connector: String,
        violations: Vec<String>,
    },

    #[error("destination check produced no connection status")]
    IndeterminateStatus,

    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded { stage: &'static str },

    #[error("cancelled during {stage}")]
    Cancelled { stage: &'static str },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("failed to load connector definitions: {0}")]
    Definitions(String),
}

impl DestinationError {
    pub(crate) fn lifecycle(stage: &'static str, message: impl std::fmt::Display) -> Self {
        Self::ContainerLifecycle {
            stage,
            message: message.to_string(),
        }
    }

    /// Whether this error came from the caller's deadline or cancellation.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. } | Self::Cancelled { .. })
    }
}

impl From<reqwest::Error> for DestinationError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, DestinationError>;
