//! Run identity and connector state types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Idempotency key for one logical destination run.
///
/// Either an explicit caller-supplied token or a deterministic digest of
/// the run inputs. Never derived from wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunKey(String);

impl RunKey {
    /// Create a new run key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RunKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RunKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Connector state
// ---------------------------------------------------------------------------

/// Connectivity state reported by a destination check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorState {
    #[default]
    Unspecified,
    Connected,
    Error,
}

impl ConnectorState {
    /// Wire-format string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_key_display_and_as_str() {
        let key = RunKey::new("retry-7");
        assert_eq!(key.as_str(), "retry-7");
        assert_eq!(key.to_string(), "retry-7");
    }

    #[test]
    fn run_key_eq_and_hash() {
        use std::collections::HashSet;
        let a = RunKey::from("k");
        let b = RunKey::new("k");
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn run_key_serde_transparent() {
        let json = serde_json::to_string(&RunKey::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn connector_state_default_is_unspecified() {
        assert_eq!(ConnectorState::default(), ConnectorState::Unspecified);
        assert_eq!(ConnectorState::Connected.to_string(), "connected");
    }
}
