//! HTTP client for the content-commit API.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sinkbyte_types::commit::CommitRecord;

use crate::error::{DestinationError, Result};

/// A pinned asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedAsset {
    pub cid: String,
    /// Lowercase hex SHA-256 of the decoded bytes.
    pub sha256: String,
}

/// A committed asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedAsset {
    pub asset_cid: String,
    pub asset_tree_cid: String,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    cid: String,
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Thin client over `POST /pin`, `POST /commit`, and `GET /identity`.
#[derive(Debug, Clone)]
pub struct CommitClient {
    http: reqwest::Client,
    api_base_url: String,
}

impl CommitClient {
    /// # Errors
    ///
    /// Returns [`DestinationError::Transport`] if the HTTP client cannot be built.
    pub fn new(api_base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base_url)
    }

    /// Decode `image_b64`, hash it, and upload it as the multipart field `file`.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Parse`] for invalid base64,
    /// [`DestinationError::UpstreamHttp`] for any response other than a 200
    /// carrying a `cid`, or [`DestinationError::Transport`].
    pub async fn pin(&self, token: &str, image_b64: &str) -> Result<PinnedAsset> {
        let bytes = STANDARD
            .decode(image_b64.trim())
            .map_err(|e| DestinationError::Parse(format!("invalid base64 asset: {e}")))?;
        let sha256 = sha256_hex(&bytes);
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name("file.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("pin"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(DestinationError::UpstreamHttp {
                status: status.as_u16(),
                body,
            });
        }
        let Ok(pinned) = serde_json::from_str::<PinResponse>(&body) else {
            return Err(DestinationError::UpstreamHttp {
                status: status.as_u16(),
                body,
            });
        };
        tracing::debug!(cid = %pinned.cid, bytes = size, "Pinned asset");
        Ok(PinnedAsset {
            cid: pinned.cid,
            sha256,
        })
    }

    /// Commit an asset record.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::UpstreamHttp`] for any response other
    /// than a 200 carrying both `assetCid` and `assetTreeCid`, or
    /// [`DestinationError::Transport`].
    pub async fn commit(&self, token: &str, record: &CommitRecord) -> Result<CommittedAsset> {
        let response = self
            .http
            .post(self.url("commit"))
            .bearer_auth(token)
            .json(record)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(DestinationError::UpstreamHttp {
                status: status.as_u16(),
                body,
            });
        }
        let Ok(committed) = serde_json::from_str::<CommittedAsset>(&body) else {
            return Err(DestinationError::UpstreamHttp {
                status: status.as_u16(),
                body,
            });
        };
        tracing::debug!(asset_cid = %committed.asset_cid, "Committed asset");
        Ok(committed)
    }

    /// Status of the identity endpoint for `token`.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::Transport`] if no response arrives.
    pub async fn identity(&self, token: &str) -> Result<StatusCode> {
        let response = self
            .http
            .get(self.url("identity"))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(response.status())
    }
}
