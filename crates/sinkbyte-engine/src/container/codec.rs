//! Record codec: pipeline payloads to newline-delimited protocol lines,
//! and connection-status scanning of destination output.

use serde_json::Value;
use sinkbyte_types::payload::DataPayload;
use sinkbyte_types::protocol::{ConnectionStatus, MessageType, ProtocolMessage, RecordMessage};

use crate::error::{DestinationError, Result};

/// Field carrying the item's data mapping index.
pub const INDEX_FIELD: &str = "index";
/// Field carrying the output name.
pub const MODEL_FIELD: &str = "model";
/// Field carrying the item's pipeline metadata.
pub const PIPELINE_FIELD: &str = "pipeline";

/// Encoded record payload ready for a destination's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecords {
    /// Newline-delimited JSON, no trailing newline.
    pub payload: Vec<u8>,
    /// Number of records in `payload`.
    pub count: usize,
}

/// Encode one record per (item, named output).
///
/// Each output object is copied unchanged and gains `index`, `model`, and
/// `pipeline` fields. All records share `emitted_at` (epoch milliseconds).
///
/// # Errors
///
/// Returns [`DestinationError::ProtocolMarshal`] if `items` is empty, no
/// item carries an output, or an output is not a JSON object.
pub fn encode_records(items: &[DataPayload], stream: &str, emitted_at: i64) -> Result<EncodedRecords> {
    if items.is_empty() {
        return Err(DestinationError::ProtocolMarshal(
            "no input items to encode".to_string(),
        ));
    }

    let mut lines = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let pipeline = item.pipeline();
        for (name, output) in &item.outputs {
            let Value::Object(fields) = output else {
                return Err(DestinationError::ProtocolMarshal(format!(
                    "items[{idx}].outputs.{name} is not an object"
                )));
            };
            let mut data = fields.clone();
            data.insert(
                INDEX_FIELD.to_string(),
                Value::String(item.data_mapping_index.clone()),
            );
            data.insert(MODEL_FIELD.to_string(), Value::String(name.clone()));
            data.insert(PIPELINE_FIELD.to_string(), pipeline.clone());

            let message = ProtocolMessage::record(RecordMessage {
                stream: stream.to_string(),
                data,
                emitted_at,
            });
            let line = serde_json::to_string(&message).map_err(|e| {
                DestinationError::ProtocolMarshal(format!("items[{idx}].outputs.{name}: {e}"))
            })?;
            lines.push(line);
        }
    }

    if lines.is_empty() {
        return Err(DestinationError::ProtocolMarshal(
            "input items carry no outputs".to_string(),
        ));
    }

    Ok(EncodedRecords {
        count: lines.len(),
        payload: lines.join("\n").into_bytes(),
    })
}

/// First `CONNECTION_STATUS` message in `output`, scanning line by line.
/// Lines that are not protocol messages are ignored.
#[must_use]
pub fn scan_connection_status(output: &str) -> Option<ConnectionStatus> {
    output
        .lines()
        .filter_map(|line| serde_json::from_str::<ProtocolMessage>(line.trim()).ok())
        .find(|msg| msg.kind == MessageType::ConnectionStatus)
        .and_then(|msg| msg.connection_status)
}
