//! Settings YAML types.
//!
//! Every section and field has a default, so an empty document is a valid
//! settings file.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "https://api.numbersprotocol.io/api/v3";
pub const DEFAULT_ASSET_PROFILE_URL: &str = "https://nftsearch.site/asset-profile";
pub const DEFAULT_GENERATED_THROUGH: &str = "https://console.instill.tech";

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub container: ContainerSettings,
    pub commit: CommitSettings,
    pub guard: GuardSettings,
}

/// A host-side source mounted at `target` inside destination containers.
///
/// The process stages files under `target`, so it must see the same
/// filesystem the container does at that path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountSettings {
    /// Absolute host path (bind mount) or named volume.
    pub source: String,
    pub target: PathBuf,
}

impl MountSettings {
    fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: PathBuf::from(target),
        }
    }
}

/// Container-backed destination settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerSettings {
    /// Pipeline workspace, also the staging root.
    pub workspace: MountSettings,
    /// Working directory for the destination tool.
    pub tool_workspace: MountSettings,
    /// Protocol stream definition; the embedded default when unset.
    pub protocol_path: Option<PathBuf>,
    /// Extra container destination definitions merged after the seeds.
    pub definitions_path: Option<PathBuf>,
    /// Bound on container removal, independent of the caller's deadline.
    pub cleanup_timeout_secs: u64,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            workspace: MountSettings::new("vdp", "/tmp/vdp"),
            tool_workspace: MountSettings::new("airbyte", "/tmp/airbyte"),
            protocol_path: None,
            definitions_path: None,
            cleanup_timeout_secs: 30,
        }
    }
}

impl ContainerSettings {
    #[must_use]
    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_secs(self.cleanup_timeout_secs)
    }
}

/// Process-wide token for the content-commit API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SharedTokenSettings {
    pub enabled: bool,
    pub token: String,
}

/// Content-commit destination settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommitSettings {
    pub api_base_url: String,
    pub asset_profile_url: String,
    /// Recorded as `custom.generatedThrough` on every commit.
    pub generated_through: String,
    pub request_timeout_secs: u64,
    pub shared_token: SharedTokenSettings,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            asset_profile_url: DEFAULT_ASSET_PROFILE_URL.to_string(),
            generated_through: DEFAULT_GENERATED_THROUGH.to_string(),
            request_timeout_secs: 30,
            shared_token: SharedTokenSettings::default(),
        }
    }
}

impl CommitSettings {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Idempotency guard settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardSettings {
    /// How long a completed run's result is retained. Zero clears on completion.
    pub completed_ttl_secs: u64,
}

impl GuardSettings {
    #[must_use]
    pub fn completed_ttl(&self) -> Duration {
        Duration::from_secs(self.completed_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings.commit.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.commit.asset_profile_url, DEFAULT_ASSET_PROFILE_URL);
        assert_eq!(settings.container.workspace.target, PathBuf::from("/tmp/vdp"));
        assert_eq!(settings.container.cleanup_timeout(), Duration::from_secs(30));
        assert_eq!(settings.guard.completed_ttl(), Duration::ZERO);
        assert!(!settings.commit.shared_token.enabled);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let yaml = "commit:\n  request_timeout_secs: 5\n";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.commit.request_timeout(), Duration::from_secs(5));
        assert_eq!(settings.commit.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let yaml = "guard:\n  ttl: 5\n";
        assert!(serde_yaml::from_str::<Settings>(yaml).is_err());
    }
}
