//! Pipeline output payloads handed to a destination.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key carrying the pipeline identifier.
pub const PIPELINE_METADATA_KEY: &str = "pipeline";

/// One pipeline output item.
///
/// `outputs` maps each named output (typically the producing model) to its
/// task output object. `data_mapping_index` is the caller-supplied index
/// used to key results back to the input that produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPayload {
    pub data_mapping_index: String,
    #[serde(default)]
    pub outputs: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DataPayload {
    /// Pipeline identifier from metadata, `Value::Null` when absent.
    #[must_use]
    pub fn pipeline(&self) -> Value {
        self.metadata
            .get(PIPELINE_METADATA_KEY)
            .cloned()
            .unwrap_or(Value::Null)
    }
}
