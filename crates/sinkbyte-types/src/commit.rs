//! Asset notarization records for the content-commit API.

use serde::{Deserialize, Serialize};

/// License attached to a committed asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitLicense {
    pub name: String,
}

/// Generation provenance of a committed asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    /// Producer (model) that generated the asset.
    pub generated_by: String,
    /// Service the asset was generated through.
    pub generated_through: String,
    pub prompt: String,
    pub creator_wallet: String,
    pub license: CommitLicense,
}

/// Metadata record committed for a pinned asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Content id returned by the pin step.
    pub asset_cid: String,
    /// Lower-case hex SHA-256 of the raw asset bytes.
    pub asset_sha256: String,
    /// MIME type of the asset.
    pub encoding_format: String,
    /// Creation time in seconds since the Unix epoch.
    pub asset_timestamp_created: i64,
    pub asset_creator: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    #[serde(rename = "custom")]
    pub generation: GenerationMetadata,
    /// Commit to the test network instead of mainnet.
    pub testnet: bool,
}
