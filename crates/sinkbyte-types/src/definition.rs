//! Connector definition types.
//!
//! A [`ConnectorDefinition`] describes one destination a caller can
//! dispatch to: its unique id, presentation metadata, the container image
//! that implements it (container-backed destinations only), and the JSON
//! schema its connection configuration must satisfy.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Container image reference (`repository:tag`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Image repository, e.g. `"airbyte/destination-local-json"`.
    pub repository: String,
    /// Image tag, e.g. `"0.2.11"`.
    pub tag: String,
}

impl ImageRef {
    /// Create a new image reference.
    #[must_use]
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Parse `repository[:tag]`. A missing tag resolves to `latest`.
    ///
    /// A colon that belongs to a registry host (`localhost:5000/img`) is
    /// not mistaken for a tag separator.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        let name_start = reference.rfind('/').map_or(0, |i| i + 1);
        match reference[name_start..].rfind(':') {
            Some(pos) => {
                let split = name_start + pos;
                Self::new(&reference[..split], &reference[split + 1..])
            }
            None => Self::new(reference, "latest"),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// A registered destination connector definition. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDefinition {
    /// Globally unique definition id.
    pub uid: Uuid,
    /// Human-readable id, e.g. `"airbyte-destination-local-json"`.
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Destination image; `None` for destinations that are not container-backed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    /// JSON schema for the connection configuration.
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

impl ConnectorDefinition {
    /// Whether this definition runs as a container image.
    #[must_use]
    pub fn is_container_backed(&self) -> bool {
        self.image.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ref_parse_with_tag() {
        let r = ImageRef::parse("airbyte/destination-csv:0.2.10");
        assert_eq!(r.repository, "airbyte/destination-csv");
        assert_eq!(r.tag, "0.2.10");
        assert_eq!(r.to_string(), "airbyte/destination-csv:0.2.10");
    }

    #[test]
    fn image_ref_parse_without_tag_defaults_latest() {
        let r = ImageRef::parse("airbyte/destination-csv");
        assert_eq!(r.tag, "latest");
    }

    #[test]
    fn image_ref_parse_ignores_registry_port() {
        let r = ImageRef::parse("localhost:5000/destination-csv");
        assert_eq!(r.repository, "localhost:5000/destination-csv");
        assert_eq!(r.tag, "latest");

        let tagged = ImageRef::parse("localhost:5000/destination-csv:1.0");
        assert_eq!(tagged.repository, "localhost:5000/destination-csv");
        assert_eq!(tagged.tag, "1.0");
    }

    #[test]
    fn definition_without_image_is_not_container_backed() {
        let def = ConnectorDefinition {
            uid: Uuid::nil(),
            id: "numbers".into(),
            title: "Numbers Protocol".into(),
            image: None,
            spec: serde_json::json!({}),
            documentation_url: None,
        };
        assert!(!def.is_container_backed());
        let json = serde_json::to_value(&def).unwrap();
        assert!(json.get("image").is_none());
    }
}
